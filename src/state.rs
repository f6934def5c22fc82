//! Keyed state store: the single source of truth for a game's mutable data
//!
//! Every piece of mutable engine data lives in a [`StateStore`] slot addressed
//! by a typed [`Key`]. The store serializes to a JSON object (the snapshot)
//! and merges a snapshot back in, which is what makes save/restore, undo and
//! replay sound operations instead of ad hoc patches.

use crate::memory::Resettable;
use crate::{EngineError, Result};
use rustc_hash::FxHashSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// A named, typed handle into the [`StateStore`].
///
/// Keys never hold data themselves - they are capabilities for reading and
/// writing one store slot. Identity is the name; name uniqueness within a
/// variant is assumed.
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Key {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.name)
    }
}

/// Handle returned by [`StateStore::listen`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    keys: Vec<&'static str>,
    callback: Rc<dyn Fn()>,
}

/// Keyed map of serializable values.
///
/// Values are stored as JSON and read/written only through a key's declared
/// shape. A BTreeMap backing keeps `serialize` output byte-identical across
/// runs, which the replay contract depends on.
///
/// Reading, updating or deleting a key that was never initialized is a
/// programming error (`Invariant`), not a recoverable one - callers must use
/// `contains`/`get_opt` when a key is conditionally present.
pub struct StateStore {
    values: RefCell<BTreeMap<String, Value>>,
    dirty: RefCell<FxHashSet<String>>,
    listeners: RefCell<Vec<Listener>>,
    next_listener: Cell<u64>,
}

impl StateStore {
    pub fn new() -> Self {
        StateStore {
            values: RefCell::new(BTreeMap::new()),
            dirty: RefCell::new(FxHashSet::default()),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        }
    }

    /// Initialize a key. Fails if the key is already present.
    pub fn init<T: Serialize>(&self, key: Key<T>, value: T) -> Result<()> {
        if self.values.borrow().contains_key(key.name()) {
            return Err(EngineError::invariant(format!(
                "state key '{}' initialized twice",
                key.name()
            )));
        }
        let encoded = encode(key.name(), &value)?;
        self.values.borrow_mut().insert(key.name().to_string(), encoded);
        self.mark_dirty(key.name());
        Ok(())
    }

    /// Read the current value of a key. Fails if the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: Key<T>) -> Result<T> {
        let values = self.values.borrow();
        let raw = values.get(key.name()).ok_or_else(|| {
            EngineError::invariant(format!("read of uninitialized state key '{}'", key.name()))
        })?;
        decode(key.name(), raw)
    }

    /// Read a conditionally-present key.
    pub fn get_opt<T: DeserializeOwned>(&self, key: Key<T>) -> Result<Option<T>> {
        let values = self.values.borrow();
        match values.get(key.name()) {
            Some(raw) => Ok(Some(decode(key.name(), raw)?)),
            None => Ok(None),
        }
    }

    pub fn contains<T>(&self, key: Key<T>) -> bool {
        self.values.borrow().contains_key(key.name())
    }

    /// Overwrite an initialized key. Fails if the key is absent.
    pub fn set<T: Serialize>(&self, key: Key<T>, value: T) -> Result<()> {
        if !self.values.borrow().contains_key(key.name()) {
            return Err(EngineError::invariant(format!(
                "write to uninitialized state key '{}'",
                key.name()
            )));
        }
        let encoded = encode(key.name(), &value)?;
        self.values.borrow_mut().insert(key.name().to_string(), encoded);
        self.mark_dirty(key.name());
        Ok(())
    }

    /// Mutate an initialized key in place.
    pub fn update<T: Serialize + DeserializeOwned>(
        &self,
        key: Key<T>,
        mutate: impl FnOnce(&mut T),
    ) -> Result<()> {
        let mut value = self.get(key)?;
        mutate(&mut value);
        self.set(key, value)
    }

    /// Remove a key entirely. Deleted keys vanish from the serialized form,
    /// so absence stays distinguishable from a falsy value.
    pub fn delete<T>(&self, key: Key<T>) -> Result<()> {
        if self.values.borrow_mut().remove(key.name()).is_none() {
            return Err(EngineError::invariant(format!(
                "delete of uninitialized state key '{}'",
                key.name()
            )));
        }
        self.mark_dirty(key.name());
        Ok(())
    }

    /// Export the store as a snapshot blob.
    pub fn serialize(&self) -> Result<String> {
        serde_json::to_string(&*self.values.borrow())
            .map_err(|e| EngineError::Serialization(e.to_string()))
    }

    /// Merge a previously exported snapshot back in.
    ///
    /// `merge(serialize(s))` on a fresh store reproduces a store observably
    /// identical to `s`.
    pub fn merge(&self, blob: &str) -> Result<()> {
        let incoming: BTreeMap<String, Value> = serde_json::from_str(blob)
            .map_err(|e| EngineError::Serialization(format!("bad snapshot: {e}")))?;
        let mut values = self.values.borrow_mut();
        let mut dirty = self.dirty.borrow_mut();
        for (name, value) in incoming {
            dirty.insert(name.clone());
            values.insert(name, value);
        }
        Ok(())
    }

    /// Subscribe to changes on a set of key names.
    ///
    /// Callbacks are batched per top-level engine call: a listener fires at
    /// most once per call even if its keys changed multiple times.
    pub fn listen(&self, keys: &[&'static str], callback: impl Fn() + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push(Listener {
            id,
            keys: keys.to_vec(),
            callback: Rc::new(callback),
        });
        id
    }

    pub fn unlisten(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|l| l.id != id);
    }

    /// Fire pending listener callbacks and clear the dirty set.
    pub fn flush_listeners(&self) {
        let dirty = std::mem::take(&mut *self.dirty.borrow_mut());
        if dirty.is_empty() {
            return;
        }
        // Clone the callbacks out first so a callback may read the store.
        let pending: Vec<Rc<dyn Fn()>> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.keys.iter().any(|k| dirty.contains(*k)))
            .map(|l| l.callback.clone())
            .collect();
        for callback in pending {
            callback();
        }
    }

    /// Number of live keys (diagnostics and tests).
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    fn mark_dirty(&self, name: &str) {
        self.dirty.borrow_mut().insert(name.to_string());
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Resettable for StateStore {
    fn reset(&self) {
        self.values.borrow_mut().clear();
        self.dirty.borrow_mut().clear();
    }
}

fn encode<T: Serialize>(name: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| EngineError::Serialization(format!("cannot encode key '{name}': {e}")))
}

fn decode<T: DeserializeOwned>(name: &str, raw: &Value) -> Result<T> {
    serde_json::from_value(raw.clone()).map_err(|e| {
        EngineError::invariant(format!("state key '{name}' holds a value of the wrong shape: {e}"))
    })
}
