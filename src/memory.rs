//! Resettable holders for transient per-call computation state
//!
//! Anything that must not leak between `start`/`process_action` calls
//! registers with [`Memory`]; the engine envelope resets every member
//! unconditionally after each call, success or failure. This is what lets one
//! cached per-variant engine instance safely interleave calls for different
//! concurrent games.

use std::cell::RefCell;
use std::rc::Rc;

/// A component whose transient state can be restored to its initial value.
pub trait Resettable {
    fn reset(&self);
}

/// A single resettable holder with an initial value.
pub struct MemoryCell<T: Clone> {
    initial: T,
    value: RefCell<T>,
}

impl<T: Clone> MemoryCell<T> {
    pub fn new(initial: T) -> Self {
        MemoryCell {
            value: RefCell::new(initial.clone()),
            initial,
        }
    }

    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = value;
    }

    pub fn update(&self, mutate: impl FnOnce(&mut T)) {
        mutate(&mut self.value.borrow_mut());
    }
}

impl<T: Clone> Resettable for MemoryCell<T> {
    fn reset(&self) {
        *self.value.borrow_mut() = self.initial.clone();
    }
}

/// Registry of everything that must be reset between engine calls.
pub struct Memory {
    members: RefCell<Vec<Rc<dyn Resettable>>>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            members: RefCell::new(Vec::new()),
        }
    }

    /// Create and register a fresh cell.
    pub fn cell<T: Clone + 'static>(&self, initial: T) -> Rc<MemoryCell<T>> {
        let cell = Rc::new(MemoryCell::new(initial));
        self.register(cell.clone());
        cell
    }

    /// Register an externally-built resettable component.
    pub fn register(&self, member: Rc<dyn Resettable>) {
        self.members.borrow_mut().push(member);
    }

    /// Reset every registered member to its initial state.
    pub fn reset_all(&self) {
        for member in self.members.borrow().iter() {
            member.reset();
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_reset() {
        let memory = Memory::new();
        let cell = memory.cell(3u32);
        cell.set(10);
        cell.update(|v| *v += 1);
        assert_eq!(cell.get(), 11);

        memory.reset_all();
        assert_eq!(cell.get(), 3);
    }

    #[test]
    fn test_reset_covers_every_member() {
        let memory = Memory::new();
        let a = memory.cell(vec![1, 2, 3]);
        let b = memory.cell(String::new());
        a.update(|v| v.clear());
        b.set("dirty".to_string());

        memory.reset_all();
        assert_eq!(a.get(), vec![1, 2, 3]);
        assert_eq!(b.get(), "");
    }
}
