//! Run-wide content hash store used to keep one copy of identical loot.
//!
//! A hash is first *reserved* by the worker that saw it first. The reservation
//! is confirmed once the loot copy is in place; if the worker fails before
//! that, dropping the reservation forgets the hash so the next file with the
//! same content is kept instead of being discarded as a duplicate. Callers that
//! hit a pending reservation wait for its outcome.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pending,
    Kept,
}

/// Set of content hashes captured so far in this run.
///
/// Entries are never evicted; the store lives as long as the run.
#[derive(Debug, Default)]
pub struct DedupStore {
    slots: Mutex<HashMap<String, Slot>>,
    settled: Condvar,
}

/// Result of [`DedupStore::claim`]
#[derive(Debug)]
#[must_use]
pub enum Claim<'a> {
    /// Caller is the first holder of this content and must keep a copy.
    New(Reservation<'a>),
    /// A copy of this content is already kept.
    Duplicate,
}

/// Pending ownership of a hash.
///
/// Released (and the hash forgotten) on drop unless [`confirm`](Self::confirm)
/// was called.
#[derive(Debug)]
#[must_use]
pub struct Reservation<'a> {
    store: &'a DedupStore,
    hash: String,
    kept: bool,
}

impl DedupStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `hash`, or report that its content is already kept.
    ///
    /// Blocks while another caller holds an unconfirmed reservation for the
    /// same hash.
    pub fn claim(&self, hash: &str) -> Claim<'_> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match slots.get(hash) {
                Some(Slot::Kept) => return Claim::Duplicate,
                Some(Slot::Pending) => {
                    slots = self
                        .settled
                        .wait(slots)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                None => {
                    slots.insert(hash.to_string(), Slot::Pending);
                    return Claim::New(Reservation {
                        store: self,
                        hash: hash.to_string(),
                        kept: false,
                    });
                }
            }
        }
    }

    /// Record `hash` as kept and report whether it had been kept before.
    ///
    /// The first caller for a hash gets `false`; every later caller gets `true`.
    pub fn is_duplicate(&self, hash: &str) -> bool {
        match self.claim(hash) {
            Claim::New(reservation) => {
                reservation.confirm();
                false
            }
            Claim::Duplicate => true,
        }
    }

    /// Number of kept hashes
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| **slot == Slot::Kept)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn settle(&self, hash: &str, kept: bool) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if kept {
            slots.insert(hash.to_string(), Slot::Kept);
        } else {
            slots.remove(hash);
        }
        drop(slots);
        self.settled.notify_all();
    }
}

impl Reservation<'_> {
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Mark the content as kept; later claims see it as a duplicate.
    pub fn confirm(mut self) {
        self.kept = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.store.settle(&self.hash, self.kept);
    }
}
