//! Per-record locks for check-then-write sequences.

use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex, PoisonError};

/// A set of held record keys, written `<collection>/<key>`.
///
/// Two callers touching the same order or stock record serialize on it;
/// callers touching disjoint records proceed in parallel. Keys are always
/// acquired together and in sorted order, so waiters cannot deadlock.
#[derive(Default)]
pub struct RecordLocks {
    held: Mutex<BTreeSet<String>>,
    released: Condvar,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until every key is free, then holds them all until the guard
    /// is dropped.
    pub fn acquire<I, S>(&self, keys: I) -> RecordGuard<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while keys.iter().any(|k| held.contains(k)) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.extend(keys.iter().cloned());
        RecordGuard { locks: self, keys }
    }

    fn release(&self, keys: &BTreeSet<String>) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            held.remove(key);
        }
        self.released.notify_all();
    }
}

/// Keys held by one caller.
pub struct RecordGuard<'a> {
    locks: &'a RecordLocks,
    keys: BTreeSet<String>,
}

impl Drop for RecordGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.keys);
    }
}
