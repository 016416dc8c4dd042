//! Target resolution: turn command-line arguments into scan units.
//!
//! Each argument is a CIDR range, a file listing targets, or a literal target.
//! Existing directories become local targets; everything else is a remote
//! host. Targets recorded as completed in the resume state are dropped.

use crate::io::state::ResumeState;
use crate::{Error, Result};
use ipnetwork::IpNetwork;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Largest CIDR range expanded (a /16 of IPv4)
pub const MAX_CIDR_ADDRESSES: u128 = 65_536;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    Local(PathBuf),
    Remote(String),
}

/// One scan unit; `id` is its resume key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub kind: TargetKind,
}

impl Target {
    /// Classify a literal target by whether it names an existing directory.
    #[must_use]
    pub fn classify(id: &str) -> Self {
        let kind = if Path::new(id).is_dir() {
            TargetKind::Local(PathBuf::from(id))
        } else {
            TargetKind::Remote(id.to_string())
        };
        Self {
            id: id.to_string(),
            kind,
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self.kind, TargetKind::Local(_))
    }
}

/// Expand `raw` if it is a CIDR range; `Ok(None)` if it is not one.
pub fn expand_cidr(raw: &str) -> Result<Option<Vec<String>>> {
    if !raw.contains('/') {
        return Ok(None);
    }
    let Ok(network) = raw.parse::<IpNetwork>() else {
        return Ok(None);
    };

    let size = match network {
        IpNetwork::V4(net) => u128::from(net.size()),
        IpNetwork::V6(net) => net.size(),
    };
    if size > MAX_CIDR_ADDRESSES {
        return Err(Error::InvalidInput(format!(
            "CIDR range {raw} has {size} addresses (limit {MAX_CIDR_ADDRESSES})"
        )));
    }

    Ok(Some(network.iter().map(|ip| ip.to_string()).collect()))
}

fn read_target_file(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in raw.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match expand_cidr(line)? {
            Some(addresses) => out.extend(addresses),
            None => out.push(line.to_string()),
        }
    }
    Ok(out)
}

/// Resolve every argument into targets, in order and without duplicates.
pub fn resolve_targets(args: &[String], resume: Option<&ResumeState>) -> Result<Vec<Target>> {
    let mut candidates = Vec::new();

    for arg in args.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
        if let Some(addresses) = expand_cidr(arg)? {
            log::info!("Expanding CIDR: {arg} ({} addresses)", addresses.len());
            candidates.extend(addresses);
            continue;
        }

        let path = Path::new(arg);
        if path.is_file() {
            log::info!("Reading targets from file: {arg}");
            candidates.extend(read_target_file(path)?);
            continue;
        }

        candidates.push(arg.to_string());
    }

    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    let mut skipped = 0usize;
    for id in candidates {
        if !seen.insert(id.clone()) {
            continue;
        }
        if resume.is_some_and(|state| state.is_completed(&id)) {
            log::debug!("Skipping completed target: {id}");
            skipped += 1;
            continue;
        }
        targets.push(Target::classify(&id));
    }

    if resume.is_some() {
        log::info!(
            "Targets after resume filter: {} ({skipped} already completed)",
            targets.len()
        );
    } else {
        log::info!("Total targets processed: {}", targets.len());
    }
    Ok(targets)
}
