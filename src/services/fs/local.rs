//! Local filesystem variant backed by `walkdir`.
//!
//! Used directly for local directory targets (paths are reported as given)
//! and, rooted at a mount point, for shares mounted by the operating system
//! (paths are reported relative to the share with `/` separators).

use super::{FileReader, FileSystem, Walk, WalkError};
use crate::models::WalkEntry;
use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Local directory tree, optionally rooted at a base directory
#[derive(Debug, Clone, Default)]
pub struct LocalFs {
    base: Option<PathBuf>,
}

impl LocalFs {
    /// Filesystem addressed by absolute or working-directory-relative paths.
    #[must_use]
    pub fn new() -> Self {
        Self { base: None }
    }

    /// Filesystem whose paths are relative to `base`; `"."` names the base itself.
    #[must_use]
    pub fn rooted<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.base {
            Some(base) if path.is_empty() || path == "." => base.clone(),
            Some(base) => base.join(path.trim_start_matches('/')),
            None => PathBuf::from(path),
        }
    }

    fn display(&self, path: &Path) -> String {
        match &self.base {
            Some(base) => {
                let relative = path.strip_prefix(base).unwrap_or(path);
                let parts: Vec<String> = relative
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(part) => Some(part.to_string_lossy().to_string()),
                        _ => None,
                    })
                    .collect();
                if parts.is_empty() {
                    ".".to_string()
                } else {
                    parts.join("/")
                }
            }
            None => normalize_path(path),
        }
    }
}

impl FileSystem for LocalFs {
    fn walk<'a>(&'a self, root: &str) -> Box<dyn Walk + 'a> {
        let inner = WalkDir::new(self.resolve(root))
            .follow_links(false)
            .into_iter();
        Box::new(LocalWalk { fs: self, inner })
    }

    fn open(&self, path: &str) -> io::Result<FileReader> {
        let file = File::open(self.resolve(path))?;
        Ok(Box::new(file))
    }
}

struct LocalWalk<'a> {
    fs: &'a LocalFs,
    inner: walkdir::IntoIter,
}

impl Iterator for LocalWalk<'_> {
    type Item = Result<WalkEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(|p| self.fs.display(p));
                    return Some(Err(WalkError {
                        path,
                        source: err.into(),
                    }));
                }
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                log::debug!("Skipping symlink: {}", entry.path().display());
                continue;
            }
            if !file_type.is_dir() && !file_type.is_file() {
                continue;
            }

            let size = if file_type.is_file() {
                entry.metadata().ok().map(|m| m.len())
            } else {
                None
            };

            return Some(Ok(WalkEntry {
                path: self.fs.display(entry.path()),
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir: file_type.is_dir(),
                depth: entry.depth(),
                size,
            }));
        }
    }
}

impl Walk for LocalWalk<'_> {
    fn skip_current_dir(&mut self) {
        self.inner.skip_current_dir();
    }
}

/// Normalize path for cross-platform matching and reporting
/// On Windows: Convert backslashes to forward slashes for consistency
/// On Unix: Use path as-is (backslash is a valid filename character)
#[cfg(windows)]
pub(crate) fn normalize_path(path: &Path) -> String {
    let path_str = path.to_string_lossy();
    if path_str.contains('\\') {
        path_str.replace('\\', "/")
    } else {
        path_str.into_owned()
    }
}

#[cfg(not(windows))]
pub(crate) fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
