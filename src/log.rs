//! Per-action log accumulation
//!
//! Ordered, in-memory, human-readable event lines for the current engine
//! call; flushed into the `GameResult` after each action. The kernel never
//! writes to stdout itself - callers decide where flushed lines go.

use crate::memory::Resettable;
use std::cell::RefCell;

pub struct GameLog {
    lines: RefCell<Vec<String>>,
}

impl GameLog {
    pub fn new() -> Self {
        GameLog {
            lines: RefCell::new(Vec::new()),
        }
    }

    pub fn log(&self, line: impl Into<String>) {
        self.lines.borrow_mut().push(line.into());
    }

    /// Take the accumulated lines, leaving the log empty.
    pub fn flush(&self) -> Vec<String> {
        std::mem::take(&mut self.lines.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.lines.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }
}

impl Default for GameLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Resettable for GameLog {
    fn reset(&self) {
        self.lines.borrow_mut().clear();
    }
}
