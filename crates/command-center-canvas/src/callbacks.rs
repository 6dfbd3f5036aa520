//! Bounded history of viewer callbacks.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::protocol::CallbackEntry;

/// Ring buffer of callback entries; the oldest entry is evicted first.
pub struct CallbackLog {
    capacity: usize,
    entries: Mutex<VecDeque<CallbackEntry>>,
}

impl CallbackLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn append(&self, entry: CallbackEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// The `n` most recent entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<CallbackEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let start = entries.len().saturating_sub(n);
        entries.range(start..).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
