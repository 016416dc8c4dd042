//! Share and Path Spidering Library
//!
//! This library crawls remote file shares and local directory trees for
//! sensitive files, filters them by name, extension and content, and copies
//! unique matches into a local loot directory. Identical content is kept once
//! per run, and every match is reported as a JSON record.

pub mod cli;
pub mod io;
pub mod models;
pub mod services;

pub use models::{DownloadJob, MatchReason, MatchResult, Origin, RunSummary, WalkEntry, WalkStats};
pub use services::dedup::DedupStore;
pub use services::matcher::{MatchConfig, Matcher};

use services::budget::ConcurrencyBudget;
use services::fs::local::LocalFs;
use services::sink::ReportSink;
use services::walker::Walker;
use std::path::{Path, PathBuf};
use std::result;

/// Custom error type for the library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Unsupported authentication: {0}")]
    UnsupportedAuth(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Signing required: {0}")]
    SigningRequired(String),
    #[error("Share listing failed: {0}")]
    ShareListing(String),
    #[error("System error: {0}")]
    System(String),
}

impl Error {
    /// Whether this failure is the server refusing unsigned share listing.
    ///
    /// Transports that only surface a message are recognized by its text.
    #[must_use]
    pub fn is_signing_required(&self) -> bool {
        match self {
            Error::SigningRequired(_) => true,
            Error::ShareListing(msg) | Error::Connect(msg) => {
                msg.to_ascii_lowercase().contains("signing required")
            }
            _ => false,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Default directory for downloaded loot
pub const DEFAULT_LOOT_DIR: &str = ".lootspider/loot";

/// How loot files are laid out under the loot directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LootLayout {
    /// `<loot>/<original path with separators as underscores>`
    #[default]
    Flat,
    /// `<loot>/<host>/<share>/<original relative path>`
    Structured,
}

/// Options for walking one filesystem root
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_depth: Option<usize>,
    pub threads: usize,
    pub loot_dir: PathBuf,
    pub download: bool,
    pub layout: LootLayout,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: Some(10),
            threads: 5,
            loot_dir: PathBuf::from(DEFAULT_LOOT_DIR),
            download: true,
            layout: LootLayout::Flat,
        }
    }
}

/// Walk a single local directory and report matches to `sink`
///
/// # Arguments
/// * `root` - The local directory to spider
/// * `opts` - Walk options (depth, threads, loot placement)
/// * `matcher` - Compiled match configuration
/// * `dedup` - Content hash store shared by the whole run
/// * `sink` - Destination for match records
///
/// # Returns
/// Counters describing what the walk saw and matched
pub fn scan_path<P: AsRef<Path>>(
    root: P,
    opts: &ScanOptions,
    matcher: &Matcher,
    dedup: &DedupStore,
    sink: &dyn ReportSink,
) -> Result<WalkStats> {
    let root_path = root.as_ref().to_string_lossy().to_string();

    if !root.as_ref().exists() {
        return Err(Error::InvalidInput(format!(
            "Path does not exist: {root_path}"
        )));
    }

    if !root.as_ref().is_dir() {
        return Err(Error::InvalidInput(format!(
            "Path is not a directory: {root_path}"
        )));
    }

    let fs = LocalFs::new();
    let origin = Origin::local(&root_path);
    let walker = Walker::new(
        opts,
        matcher,
        &fs,
        dedup,
        sink,
        ConcurrencyBudget::owned(opts.threads),
        origin,
    );

    Ok(walker.walk(&root_path))
}
