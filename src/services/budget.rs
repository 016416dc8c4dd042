//! Concurrency budgets for per-file work.
//!
//! A budget is either owned by one walk (sized from its thread count) or
//! shared by every share walk of one host, so `threads` caps the host as a
//! whole rather than each share.

use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Counting semaphore with RAII permits
#[derive(Debug)]
pub struct Semaphore {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

impl Semaphore {
    /// Create a semaphore with `permits` slots (at least one).
    #[must_use]
    pub fn new(permits: usize) -> Self {
        let capacity = permits.max(1);
        Self {
            available: Mutex::new(capacity),
            released: Condvar::new(),
            capacity,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Block until a slot is free and take it.
    pub fn acquire(&self) -> Permit<'_> {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        while *available == 0 {
            available = self
                .released
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
        Permit { semaphore: self }
    }

    fn release(&self) {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        *available += 1;
        drop(available);
        self.released.notify_one();
    }
}

/// Slot held until dropped
#[derive(Debug)]
pub struct Permit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

/// Per-file concurrency limit handed to a walk
#[derive(Debug, Clone)]
pub enum ConcurrencyBudget {
    /// Private to one walk
    Owned(Arc<Semaphore>),
    /// Borrowed from the host and shared with sibling share walks
    Shared(Arc<Semaphore>),
}

impl ConcurrencyBudget {
    /// Fresh budget sized by a thread count (minimum one).
    #[must_use]
    pub fn owned(threads: usize) -> Self {
        ConcurrencyBudget::Owned(Arc::new(Semaphore::new(threads)))
    }

    /// Budget backed by a semaphore that other walks also draw from.
    #[must_use]
    pub fn shared(semaphore: &Arc<Semaphore>) -> Self {
        ConcurrencyBudget::Shared(Arc::clone(semaphore))
    }

    #[must_use]
    pub fn is_shared(&self) -> bool {
        matches!(self, ConcurrencyBudget::Shared(_))
    }

    #[must_use]
    pub fn semaphore(&self) -> &Semaphore {
        match self {
            ConcurrencyBudget::Owned(sem) | ConcurrencyBudget::Shared(sem) => sem,
        }
    }

    pub fn acquire(&self) -> Permit<'_> {
        self.semaphore().acquire()
    }
}
