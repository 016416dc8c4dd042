//! Filesystem capability consumed by the walker and the download pipeline.
//!
//! Two operations are required of every variant: a lazy depth-first walk and
//! opening a file for reading. Local directories and mounted remote shares
//! both implement it; remote-share sessions are described in [`remote`].

pub mod local;
pub mod remote;

use crate::models::WalkEntry;
use std::io::{self, Read};

/// Error yielded for one entry during a walk. The walk continues afterwards.
#[derive(Debug, thiserror::Error)]
#[error("{}{source}", .path.as_deref().map(|p| format!("{p}: ")).unwrap_or_default())]
pub struct WalkError {
    pub path: Option<String>,
    #[source]
    pub source: io::Error,
}

/// Depth-first walk, directories before their children.
pub trait Walk: Iterator<Item = Result<WalkEntry, WalkError>> {
    /// Do not descend into the directory most recently yielded.
    fn skip_current_dir(&mut self);
}

/// Readable source handed out by [`FileSystem::open`]
pub type FileReader = Box<dyn Read + Send>;

/// Walk and open capability over one filesystem root
pub trait FileSystem: Send + Sync {
    /// Start a lazy walk at `root`. The root itself is yielded first at depth 0.
    fn walk<'a>(&'a self, root: &str) -> Box<dyn Walk + 'a>;

    /// Open a file previously yielded by `walk`.
    ///
    /// Fails with `NotFound`, `PermissionDenied`, or another kind for
    /// transport errors.
    fn open(&self, path: &str) -> io::Result<FileReader>;
}
