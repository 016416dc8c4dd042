//! Report sinks receiving match records as they are confirmed.

use crate::MatchResult;
use std::io;

/// Append-only destination for match records, shared by every walk of a run.
pub trait ReportSink: Send + Sync {
    /// Record one confirmed match. Implementations stamp the timestamp.
    fn record(&self, result: MatchResult) -> io::Result<()>;

    /// Flush anything buffered once the run completes.
    fn finish(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink used when no output file is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn record(&self, _result: MatchResult) -> io::Result<()> {
        Ok(())
    }
}

pub mod jsonl;
pub mod memory;
