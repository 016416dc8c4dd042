//! Concurrency orchestrator: fans targets out to a bounded pool and the shares
//! of each remote target out to walks sharing one per-host budget.
//!
//! A target counts as finished once its task returns, whatever the outcome,
//! and is then recorded in the resume state.

use crate::io::state::ResumeState;
use crate::models::{Origin, RunSummary, WalkStats};
use crate::services::budget::{ConcurrencyBudget, Semaphore};
use crate::services::dedup::DedupStore;
use crate::services::fs::FileSystem;
use crate::services::fs::local::LocalFs;
use crate::services::fs::remote::{
    Credentials, IPC_SHARE, ShareConnector, UnavailableConnector,
};
use crate::services::matcher::Matcher;
use crate::services::sink::ReportSink;
use crate::services::targets::{Target, TargetKind};
use crate::services::walker::Walker;
use crate::{Error, Result, ScanOptions};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Options for a whole run across targets
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Targets scanned at the same time
    pub concurrent_hosts: usize,
    /// Shares to scan instead of listing them
    pub share_names: Vec<String>,
    pub credentials: Credentials,
    /// Deadline for blocking share transport operations
    pub io_timeout: Option<Duration>,
    pub scan: ScanOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrent_hosts: 5,
            share_names: Vec::new(),
            credentials: Credentials::default(),
            io_timeout: None,
            scan: ScanOptions::default(),
        }
    }
}

pub struct Orchestrator {
    options: RunOptions,
    matcher: Arc<Matcher>,
    sink: Arc<dyn ReportSink>,
    dedup: Arc<DedupStore>,
    resume: Option<Arc<ResumeState>>,
    connector: Arc<dyn ShareConnector>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(options: RunOptions, matcher: Arc<Matcher>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            options,
            matcher,
            sink,
            dedup: Arc::new(DedupStore::new()),
            resume: None,
            connector: Arc::new(UnavailableConnector),
        }
    }

    /// Share a dedup store with other runs (e.g. successive scans in one process).
    #[must_use]
    pub fn with_dedup(mut self, dedup: Arc<DedupStore>) -> Self {
        self.dedup = dedup;
        self
    }

    #[must_use]
    pub fn with_resume(mut self, resume: Arc<ResumeState>) -> Self {
        self.resume = Some(resume);
        self
    }

    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn ShareConnector>) -> Self {
        self.connector = connector;
        self
    }

    #[must_use]
    pub fn dedup(&self) -> &DedupStore {
        &self.dedup
    }

    /// Scan every target and wait for all of them.
    pub fn run(&self, targets: &[Target]) -> Result<RunSummary> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.concurrent_hosts.max(1))
            .thread_name(|i| format!("lootspider-target-{i}"))
            .build()
            .map_err(|e| Error::System(format!("failed to build target pool: {e}")))?;

        let total = targets.len();
        let finished = AtomicUsize::new(0);
        let stats = Mutex::new(WalkStats::default());
        let failed = Mutex::new(Vec::new());

        pool.install(|| {
            targets.par_iter().for_each(|target| {
                match self.scan_target(target) {
                    Ok(target_stats) => stats
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .absorb(&target_stats),
                    Err(err) => {
                        log::error!("Failed to scan {}: {err}", target.id);
                        if let Some(resume) = &self.resume {
                            log::warn!(
                                "{} is recorded as completed; remove it from {} to retry",
                                target.id,
                                resume.path().display()
                            );
                        }
                        failed
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push((target.id.clone(), err.to_string()));
                    }
                }

                let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                log::info!("Progress: Hosts [{done}/{total}] - Finished {}", target.id);

                if let Some(resume) = &self.resume
                    && let Err(err) = resume.mark_completed(&target.id)
                {
                    log::error!("Failed to save state: {err}");
                }
            });
        });

        if let Err(err) = self.sink.finish() {
            log::warn!("Failed to flush report: {err}");
        }

        let failed = failed.into_inner().unwrap_or_else(PoisonError::into_inner);
        Ok(RunSummary {
            targets: total,
            completed: total - failed.len(),
            failed,
            stats: stats.into_inner().unwrap_or_else(PoisonError::into_inner),
        })
    }

    fn scan_target(&self, target: &Target) -> Result<WalkStats> {
        match &target.kind {
            TargetKind::Local(path) => Ok(self.scan_local(&target.id, path)),
            TargetKind::Remote(host) => self.scan_remote(host),
        }
    }

    fn scan_local(&self, id: &str, path: &Path) -> WalkStats {
        log::info!("Scanning local path: {id}");
        let fs = LocalFs::new();
        let walker = Walker::new(
            &self.options.scan,
            &self.matcher,
            &fs,
            &self.dedup,
            self.sink.as_ref(),
            ConcurrencyBudget::owned(self.options.scan.threads),
            Origin::local(id),
        );
        walker.walk(&path.to_string_lossy())
    }

    fn scan_remote(&self, host: &str) -> Result<WalkStats> {
        log::info!("Scanning remote target: {host}");
        let auth = self.options.credentials.auth_method()?;
        let session = self
            .connector
            .connect(host, &auth, self.options.io_timeout)?;

        let shares = if self.options.share_names.is_empty() {
            session.list_shares().inspect_err(|err| {
                if err.is_signing_required() {
                    log::warn!("{host} requires signing, which interfered with share listing.");
                    log::warn!(
                        "TRY: specifying shares manually with --sharenames (e.g. '--sharenames C$,ADMIN$,Users')"
                    );
                }
            })?
        } else {
            self.options.share_names.clone()
        };

        // Mount serially; scan concurrently.
        let mut mounted: Vec<(String, Box<dyn FileSystem>)> = Vec::new();
        for share in shares {
            if share.eq_ignore_ascii_case(IPC_SHARE) {
                log::debug!("Skipping {share} share on {host}");
                continue;
            }
            match session.mount(&share) {
                Ok(fs) => mounted.push((share, fs)),
                Err(err) => log::warn!("Failed to mount {share} on {host}: {err}"),
            }
        }

        let host_budget = Arc::new(Semaphore::new(self.options.scan.threads));
        let stats = Mutex::new(WalkStats::default());

        thread::scope(|scope| {
            for (share, fs) in &mounted {
                let host_budget = &host_budget;
                let stats = &stats;
                scope.spawn(move || {
                    log::info!("Scanning share: \\\\{host}\\{share}");
                    let walker = Walker::new(
                        &self.options.scan,
                        &self.matcher,
                        fs.as_ref(),
                        &self.dedup,
                        self.sink.as_ref(),
                        ConcurrencyBudget::shared(host_budget),
                        Origin::new(host, share),
                    );
                    let share_stats = walker.walk(".");
                    stats
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .absorb(&share_stats);
                });
            }
        });

        Ok(stats.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}
