//! Task registry — the in-memory table of live dispatch loops.
//!
//! `try_start` is the only duplicate-loop guard in the system, and `stop`
//! the only cancellation signal; loops check membership at the top of every
//! send. The set itself never leaks out of this type.

use std::collections::HashSet;
use std::sync::Mutex;

/// Registry of accounts that currently own a dispatch loop.
#[derive(Default)]
pub struct TaskRegistry {
    active: Mutex<HashSet<String>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim an account. Returns `false` if a loop already owns
    /// it, otherwise registers it and returns `true`. Check and set happen
    /// under one lock, so two racing starts can never both win.
    pub fn try_start(&self, account_id: &str) -> bool {
        self.active.lock().unwrap().insert(account_id.to_string())
    }

    /// Release an account. The owning loop notices at the top of its next
    /// send and exits silently. Returns whether the account was present.
    pub fn stop(&self, account_id: &str) -> bool {
        self.active.lock().unwrap().remove(account_id)
    }

    pub fn is_active(&self, account_id: &str) -> bool {
        self.active.lock().unwrap().contains(account_id)
    }

    /// Sorted snapshot of the active account ids.
    pub fn active_accounts(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.active.lock().unwrap().iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
