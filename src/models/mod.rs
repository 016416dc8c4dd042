//! Data models for walk entries, match records and run summaries

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Host label used for local directory targets
pub const LOCAL_HOST: &str = "Local";

/// One entry produced lazily by a filesystem walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: String,
    pub name: String,
    pub is_dir: bool,
    pub depth: usize,
    pub size: Option<u64>,
}

/// Why a file was reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchReason {
    Filename,
    /// Content pattern hit; carries the matching line, possibly empty
    Content(String),
    /// No name or content terms configured, so every admitted file matches
    ExtensionAll,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchReason::Filename => f.write_str("Filename"),
            MatchReason::Content(snippet) if snippet.is_empty() => f.write_str("Content"),
            MatchReason::Content(snippet) => write!(f, "Content: {snippet}"),
            MatchReason::ExtensionAll => f.write_str("Extension/All"),
        }
    }
}

impl std::str::FromStr for MatchReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Filename" => Ok(MatchReason::Filename),
            "Extension/All" => Ok(MatchReason::ExtensionAll),
            "Content" => Ok(MatchReason::Content(String::new())),
            other => other
                .strip_prefix("Content: ")
                .map(|snippet| MatchReason::Content(snippet.to_string()))
                .ok_or_else(|| format!("unknown match reason '{other}'")),
        }
    }
}

impl Serialize for MatchReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MatchReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A confirmed match, emitted exactly once per matched file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub path: String,
    pub reason: MatchReason,
    #[serde(rename = "sha256", default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub share: String,
}

impl MatchResult {
    #[must_use]
    pub fn new(path: &str, reason: MatchReason, origin: &Origin) -> Self {
        Self {
            path: path.to_string(),
            reason,
            hash: None,
            size: None,
            timestamp: String::new(),
            host: origin.host.clone(),
            share: origin.share.clone(),
        }
    }

    /// Fill in the RFC3339 timestamp unless one is already set.
    pub fn stamp(&mut self) {
        if self.timestamp.is_empty() {
            self.timestamp =
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        }
    }
}

/// Match queued for asynchronous download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub path: String,
    pub reason: MatchReason,
}

/// Host and share a walk is rooted in
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Origin {
    pub host: String,
    pub share: String,
}

impl Origin {
    #[must_use]
    pub fn new(host: &str, share: &str) -> Self {
        Self {
            host: host.to_string(),
            share: share.to_string(),
        }
    }

    /// Origin for a local directory target: the directory stands in for the share.
    #[must_use]
    pub fn local(root: &str) -> Self {
        Self::new(LOCAL_HOST, root)
    }
}

/// Counters describing a single walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub entries: u64,
    pub files_considered: u64,
    pub excluded: u64,
    pub content_checks: u64,
    pub matches: u64,
    pub downloads: u64,
    pub duplicates: u64,
    pub errors: u64,
}

impl WalkStats {
    pub fn absorb(&mut self, other: &WalkStats) {
        self.entries += other.entries;
        self.files_considered += other.files_considered;
        self.excluded += other.excluded;
        self.content_checks += other.content_checks;
        self.matches += other.matches;
        self.downloads += other.downloads;
        self.duplicates += other.duplicates;
        self.errors += other.errors;
    }
}

/// Outcome of a whole run across all targets
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub targets: usize,
    pub completed: usize,
    /// Targets that could not be scanned, with the reason
    pub failed: Vec<(String, String)>,
    pub stats: WalkStats,
}
