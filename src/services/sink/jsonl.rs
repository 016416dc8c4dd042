//! JSON-lines report file: one `MatchResult` object per line.

use super::ReportSink;
use crate::MatchResult;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub struct JsonLinesSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonLinesSink {
    /// Create (or truncate) the report file, creating parent directories.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::open(path.as_ref(), false)
    }

    /// Append to an existing report, e.g. when resuming a run.
    pub fn append<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::open(path.as_ref(), true)
    }

    fn open(path: &Path, append: bool) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonLinesSink {
    fn record(&self, mut result: MatchResult) -> io::Result<()> {
        result.stamp();
        let line = serde_json::to_string(&result).map_err(io::Error::other)?;

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        // Keep the report readable while a long run is still in progress.
        writer.flush()
    }

    fn finish(&self) -> io::Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}
