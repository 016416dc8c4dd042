//! In-memory sink retaining every record for callers that inspect results.

use super::ReportSink;
use crate::MatchResult;
use std::io;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<MatchResult>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records so far, sorted by path.
    #[must_use]
    pub fn results(&self) -> Vec<MatchResult> {
        let mut results = self
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        results.sort_by(|a, b| a.path.cmp(&b.path));
        results
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReportSink for MemorySink {
    fn record(&self, mut result: MatchResult) -> io::Result<()> {
        result.stamp();
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);
        Ok(())
    }
}
