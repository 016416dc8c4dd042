//! Resume state: the set of targets already attempted, persisted as JSON.
//!
//! The file is rewritten in full on every completion and replaced atomically,
//! so an interrupted run leaves either the previous or the new state behind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// On-disk layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub completed_hosts: BTreeMap<String, bool>,
}

#[derive(Debug, Default)]
struct Snapshot {
    state: StateFile,
    generation: u64,
}

/// Completed-target store shared by every target task of a run
#[derive(Debug)]
pub struct ResumeState {
    path: PathBuf,
    inner: Mutex<Snapshot>,
    /// Generation most recently written to disk
    written: Mutex<u64>,
}

impl ResumeState {
    /// Load state from `path`. A missing file starts empty; a corrupt one is
    /// discarded with a warning.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|err| {
                log::warn!(
                    "Failed to parse state file {}: {err}. Starting fresh.",
                    path.display()
                );
                StateFile::default()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => StateFile::default(),
            Err(err) => return Err(err),
        };

        Ok(Self {
            path,
            inner: Mutex::new(Snapshot {
                state,
                generation: 0,
            }),
            written: Mutex::new(0),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_completed(&self, id: &str) -> bool {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.state.completed_hosts.get(id).copied().unwrap_or(false)
    }

    /// Completed target identifiers in sorted order
    #[must_use]
    pub fn completed(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .state
            .completed_hosts
            .iter()
            .filter(|(_, done)| **done)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Record `id` as attempted and persist the whole state.
    ///
    /// The in-memory state is updated even when the write fails.
    pub fn mark_completed(&self, id: &str) -> io::Result<()> {
        let (generation, content) = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.state.completed_hosts.insert(id.to_string(), true);
            inner.generation += 1;
            let content = serde_json::to_vec_pretty(&inner.state).map_err(io::Error::other)?;
            (inner.generation, content)
        };

        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        if *written >= generation {
            // A newer snapshot already reached the disk.
            return Ok(());
        }
        write_atomic(&self.path, &content)?;
        *written = generation;
        Ok(())
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent)?;
            parent
        }
        _ => Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    staged.write_all(content)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}
