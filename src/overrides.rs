//! Per-variant component resolution with override precedence
//!
//! Each variant substitutes its own implementation of any engine component
//! without touching shared code: the engine binds a default constructor per
//! [`ExtensionPoint`], the variant binds overrides, and every request for a
//! point resolves to the override when one exists - including requests made
//! transitively by other default components. Resolution is memoized per point
//! within one resolver, so a component is a singleton for one variant.
//!
//! There is deliberately no global registry: one resolver is built per
//! variant key and cached by the engine delegator for the process lifetime.

use crate::{EngineError, Result};
use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

/// A named component slot. `Api` is the capability interface the slot
/// resolves to; it is usually a trait object type.
pub trait ExtensionPoint: 'static {
    type Api: ?Sized + 'static;
    const NAME: &'static str;
}

type Ctor<A> = Rc<dyn Fn(&OverrideResolver) -> Result<Rc<A>>>;

struct Binding {
    default: Box<dyn Any>,
    override_ctor: Option<Box<dyn Any>>,
}

pub struct OverrideResolver {
    bindings: FxHashMap<TypeId, Binding>,
    cache: RefCell<FxHashMap<TypeId, Box<dyn Any>>>,
    base_cache: RefCell<FxHashMap<TypeId, Box<dyn Any>>>,
    // (point, resolving-base) pairs currently under construction, for
    // fail-fast cycle detection.
    resolving: RefCell<Vec<(TypeId, bool, &'static str)>>,
}

impl OverrideResolver {
    pub fn new() -> Self {
        OverrideResolver {
            bindings: FxHashMap::default(),
            cache: RefCell::new(FxHashMap::default()),
            base_cache: RefCell::new(FxHashMap::default()),
            resolving: RefCell::new(Vec::new()),
        }
    }

    /// Bind the default constructor for a point. The constructor may resolve
    /// other points through the resolver it is handed.
    pub fn bind<E: ExtensionPoint>(
        &mut self,
        ctor: impl Fn(&OverrideResolver) -> Result<Rc<E::Api>> + 'static,
    ) {
        let ctor: Ctor<E::Api> = Rc::new(ctor);
        self.bindings.insert(
            TypeId::of::<E>(),
            Binding {
                default: Box::new(ctor),
                override_ctor: None,
            },
        );
    }

    /// Bind a variant override for an already-bound point. The override
    /// constructor may call [`OverrideResolver::resolve_base`] to hold and
    /// delegate to the default behavior it replaces.
    pub fn bind_override<E: ExtensionPoint>(
        &mut self,
        ctor: impl Fn(&OverrideResolver) -> Result<Rc<E::Api>> + 'static,
    ) -> Result<()> {
        let binding = self.bindings.get_mut(&TypeId::of::<E>()).ok_or_else(|| {
            EngineError::invariant(format!("override for unbound component '{}'", E::NAME))
        })?;
        let ctor: Ctor<E::Api> = Rc::new(ctor);
        binding.override_ctor = Some(Box::new(ctor));
        Ok(())
    }

    /// Resolve a point to its singleton instance, preferring the variant
    /// override when one is bound.
    pub fn resolve<E: ExtensionPoint>(&self) -> Result<Rc<E::Api>> {
        let point = TypeId::of::<E>();
        if let Some(hit) = self.cache.borrow().get(&point) {
            return downcast_instance::<E>(hit.as_ref());
        }

        let override_ctor = match self.bindings.get(&point) {
            Some(binding) => match &binding.override_ctor {
                Some(slot) => Some(downcast_ctor::<E>(slot.as_ref())?),
                None => None,
            },
            None => {
                return Err(EngineError::invariant(format!(
                    "no binding for component '{}'",
                    E::NAME
                )))
            }
        };

        let instance = match override_ctor {
            Some(ctor) => self.construct::<E>(false, &ctor)?,
            None => self.resolve_base::<E>()?,
        };
        self.cache
            .borrow_mut()
            .insert(point, Box::new(instance.clone()));
        Ok(instance)
    }

    /// Resolve the default binding for a point, ignoring any override.
    /// This is the explicit "base behavior" reference an override may wrap.
    pub fn resolve_base<E: ExtensionPoint>(&self) -> Result<Rc<E::Api>> {
        let point = TypeId::of::<E>();
        if let Some(hit) = self.base_cache.borrow().get(&point) {
            return downcast_instance::<E>(hit.as_ref());
        }

        let ctor = {
            let binding = self.bindings.get(&point).ok_or_else(|| {
                EngineError::invariant(format!("no binding for component '{}'", E::NAME))
            })?;
            downcast_ctor::<E>(binding.default.as_ref())?
        };

        let instance = self.construct::<E>(true, &ctor)?;
        self.base_cache
            .borrow_mut()
            .insert(point, Box::new(instance.clone()));
        Ok(instance)
    }

    /// Run a constructor under the cycle guard. An override wrapping its own
    /// base is not a cycle (the base entry is tracked separately); a point
    /// re-entering its own construction path is.
    fn construct<E: ExtensionPoint>(&self, base: bool, ctor: &Ctor<E::Api>) -> Result<Rc<E::Api>> {
        let point = TypeId::of::<E>();
        {
            let stack = self.resolving.borrow();
            if stack.iter().any(|(t, b, _)| *t == point && *b == base) {
                let chain: Vec<&str> = stack
                    .iter()
                    .map(|(_, _, name)| *name)
                    .chain(std::iter::once(E::NAME))
                    .collect();
                return Err(EngineError::invariant(format!(
                    "component dependency cycle: {}",
                    chain.join(" -> ")
                )));
            }
        }
        self.resolving.borrow_mut().push((point, base, E::NAME));
        let result = ctor(self);
        self.resolving.borrow_mut().pop();
        result
    }
}

impl Default for OverrideResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast_instance<E: ExtensionPoint>(slot: &dyn Any) -> Result<Rc<E::Api>> {
    slot.downcast_ref::<Rc<E::Api>>().cloned().ok_or_else(|| {
        EngineError::invariant(format!("cached component '{}' has the wrong type", E::NAME))
    })
}

fn downcast_ctor<E: ExtensionPoint>(slot: &dyn Any) -> Result<Ctor<E::Api>> {
    slot.downcast_ref::<Ctor<E::Api>>().cloned().ok_or_else(|| {
        EngineError::invariant(format!("binding for component '{}' has the wrong type", E::NAME))
    })
}
