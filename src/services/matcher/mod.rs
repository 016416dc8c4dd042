//! Match engine: compiles filter, exclude and preset patterns once and answers
//! yes/no questions per path and per extracted text.
//!
//! All patterns are case-insensitive. Exclusions are literal substrings; every
//! other category is a regular expression. The compiled `Matcher` is
//! immutable and shared read-only by every walk in a run.

pub mod excludes;
pub mod presets;

use crate::{Error, Result};
use regex::{RegexBuilder, RegexSet, RegexSetBuilder};
use std::collections::HashSet;

/// Longest snippet reported for a content match, in characters
pub const SNIPPET_MAX_CHARS: usize = 80;

/// Raw pattern configuration supplied by the operator
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub filenames: Vec<String>,
    pub extensions: Vec<String>,
    pub content: Vec<String>,
    pub dirnames: Vec<String>,
    pub presets: Vec<String>,
    pub excludes: Vec<String>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            filenames: Vec::new(),
            extensions: Vec::new(),
            content: Vec::new(),
            dirnames: Vec::new(),
            presets: Vec::new(),
            excludes: excludes::default_excludes(),
        }
    }
}

impl MatchConfig {
    /// Drop every exclusion, including the built-in defaults.
    #[must_use]
    pub fn without_excludes(mut self) -> Self {
        self.excludes.clear();
        self
    }
}

/// A category of compiled patterns. `None` means nothing was configured.
#[derive(Debug, Clone)]
struct PatternSet(Option<RegexSet>);

impl PatternSet {
    fn regex(patterns: &[String]) -> Result<Self> {
        for pattern in patterns {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| Error::Pattern {
                    pattern: pattern.clone(),
                    source,
                })?;
        }
        Self::build(patterns)
    }

    fn literal(patterns: &[String]) -> Result<Self> {
        let escaped: Vec<String> = patterns.iter().map(|p| regex::escape(p)).collect();
        Self::build(&escaped)
    }

    fn build(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self(None));
        }
        let set = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()
            .map_err(|source| Error::Pattern {
                pattern: patterns.join(" | "),
                source,
            })?;
        Ok(Self(Some(set)))
    }

    fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    fn is_match(&self, haystack: &str) -> bool {
        self.0.as_ref().is_some_and(|set| set.is_match(haystack))
    }
}

/// Compiled, immutable match engine
#[derive(Debug, Clone)]
pub struct Matcher {
    filenames: PatternSet,
    content: PatternSet,
    dirnames: PatternSet,
    excludes: PatternSet,
    extensions: HashSet<String>,
    content_pattern_count: usize,
}

impl Matcher {
    /// Compile a configuration. Presets are expanded into content patterns.
    pub fn new(config: &MatchConfig) -> Result<Self> {
        let mut content = config.content.clone();
        for name in &config.presets {
            let patterns = presets::preset_patterns(name).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "unknown preset '{name}' (available: {})",
                    presets::preset_names().join(", ")
                ))
            })?;
            content.extend(patterns.iter().map(|p| (*p).to_string()));
        }

        let extensions = config
            .extensions
            .iter()
            .map(|e| normalize_extension(e))
            .collect();

        Ok(Self {
            filenames: PatternSet::regex(&config.filenames)?,
            content: PatternSet::regex(&content)?,
            dirnames: PatternSet::regex(&config.dirnames)?,
            excludes: PatternSet::literal(&config.excludes)?,
            extensions,
            content_pattern_count: content.len(),
        })
    }

    #[must_use]
    pub fn has_filename_terms(&self) -> bool {
        self.filenames.is_configured()
    }

    #[must_use]
    pub fn has_content_terms(&self) -> bool {
        self.content.is_configured()
    }

    /// Number of content patterns after preset expansion
    #[must_use]
    pub fn content_pattern_count(&self) -> usize {
        self.content_pattern_count
    }

    /// True if the allow-list is empty or holds the name's lowercase extension.
    #[must_use]
    pub fn check_extension(&self, name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let ext = name
            .rfind('.')
            .map(|idx| name[idx..].to_lowercase())
            .unwrap_or_default();
        self.extensions.contains(&ext)
    }

    /// True if any filename pattern matches.
    ///
    /// Returns false when no filename patterns are configured; callers must
    /// check `has_filename_terms` to tell the two cases apart.
    #[must_use]
    pub fn check_filename(&self, name: &str) -> bool {
        self.filenames.is_match(name)
    }

    /// Find the first line matching any content pattern.
    ///
    /// With no content patterns configured this returns `Some("")`: content
    /// filtering was not requested, so it never blocks a match.
    #[must_use]
    pub fn check_content(&self, text: &str) -> Option<String> {
        if !self.content.is_configured() {
            return Some(String::new());
        }
        text.split('\n')
            .find(|line| self.content.is_match(line))
            .map(snippet)
    }

    /// True if any exclusion occurs anywhere in the path.
    #[must_use]
    pub fn check_exclude(&self, path: &str) -> bool {
        self.excludes.is_match(path)
    }

    /// True if no directory patterns are configured or any matches the path.
    #[must_use]
    pub fn check_dir(&self, path: &str) -> bool {
        !self.dirnames.is_configured() || self.dirnames.is_match(path)
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

fn snippet(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.chars().count() > SNIPPET_MAX_CHARS {
        let cut: String = trimmed.chars().take(SNIPPET_MAX_CHARS).collect();
        format!("{cut}...")
    } else {
        trimmed.to_string()
    }
}
