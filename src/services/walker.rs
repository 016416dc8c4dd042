//! Walker/Matcher pipeline for one filesystem root.
//!
//! The walk runs on the calling thread. Filename and blanket matches are
//! dispatched inline; content checks run on scoped threads gated by the
//! walk's [`ConcurrencyBudget`]. In download mode matches go through a bounded
//! queue to a fixed pool of download workers, and the walk returns only once
//! every content check has finished and the queue has drained.

use crate::models::{DownloadJob, MatchReason, MatchResult, Origin, WalkEntry, WalkStats};
use crate::services::budget::ConcurrencyBudget;
use crate::services::dedup::DedupStore;
use crate::services::download::{
    DOWNLOAD_QUEUE_CAPACITY, DOWNLOAD_WORKERS, DownloadTally, Downloader,
};
use crate::services::extract::{self, MAX_CONTENT_BYTES};
use crate::services::fs::FileSystem;
use crate::services::matcher::Matcher;
use crate::services::sink::ReportSink;
use crate::ScanOptions;
use crossbeam_channel::Sender;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

/// Where confirmed matches go
enum Dispatch {
    /// Report immediately (no-download mode)
    Report,
    /// Queue for the download workers
    Queue(Sender<DownloadJob>),
}

#[derive(Default)]
struct Counters {
    entries: AtomicU64,
    files_considered: AtomicU64,
    excluded: AtomicU64,
    content_checks: AtomicU64,
    matches: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, downloads: DownloadTally) -> WalkStats {
        WalkStats {
            entries: self.entries.load(Ordering::Relaxed),
            files_considered: self.files_considered.load(Ordering::Relaxed),
            excluded: self.excluded.load(Ordering::Relaxed),
            content_checks: self.content_checks.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
            downloads: downloads.downloads,
            duplicates: downloads.duplicates,
            errors: self.errors.load(Ordering::Relaxed) + downloads.failures,
        }
    }
}

/// Walks one root and dispatches matches
pub struct Walker<'a> {
    opts: &'a ScanOptions,
    matcher: &'a Matcher,
    fs: &'a dyn FileSystem,
    dedup: &'a DedupStore,
    sink: &'a dyn ReportSink,
    budget: ConcurrencyBudget,
    origin: Origin,
}

impl<'a> Walker<'a> {
    #[must_use]
    pub fn new(
        opts: &'a ScanOptions,
        matcher: &'a Matcher,
        fs: &'a dyn FileSystem,
        dedup: &'a DedupStore,
        sink: &'a dyn ReportSink,
        budget: ConcurrencyBudget,
        origin: Origin,
    ) -> Self {
        Self {
            opts,
            matcher,
            fs,
            dedup,
            sink,
            budget,
            origin,
        }
    }

    /// Walk `root` to completion and return its counters.
    pub fn walk(&self, root: &str) -> WalkStats {
        log::info!("Starting walk on: {root}");
        let counters = Counters::default();

        let tally = if self.opts.download {
            self.walk_with_downloads(root, &counters)
        } else {
            self.traverse(root, Dispatch::Report, &counters);
            DownloadTally::default()
        };

        let stats = counters.snapshot(tally);
        log::debug!("Finished walk on {root}: {stats:?}");
        stats
    }

    fn walk_with_downloads(&self, root: &str, counters: &Counters) -> DownloadTally {
        let downloader = Downloader::new(
            self.fs,
            self.dedup,
            &self.opts.loot_dir,
            self.opts.layout,
            &self.origin,
        );
        let (tx, rx) = crossbeam_channel::bounded(DOWNLOAD_QUEUE_CAPACITY);

        thread::scope(|scope| {
            let workers: Vec<_> = (0..DOWNLOAD_WORKERS)
                .map(|_| {
                    let rx = rx.clone();
                    let downloader = &downloader;
                    scope.spawn(move || downloader.drain(&rx, self.sink))
                })
                .collect();
            drop(rx);

            // Returns after every content check; dropping the sender closes the queue.
            self.traverse(root, Dispatch::Queue(tx), counters);

            workers
                .into_iter()
                .map(|worker| {
                    worker.join().unwrap_or_else(|_| {
                        log::error!("Download worker panicked");
                        DownloadTally::default()
                    })
                })
                .sum::<DownloadTally>()
        })
    }

    fn traverse(&self, root: &str, dispatch: Dispatch, counters: &Counters) {
        let mut walk = self.fs.walk(root);
        let dispatch = &dispatch;
        let has_filename_terms = self.matcher.has_filename_terms();
        let has_content_terms = self.matcher.has_content_terms();

        thread::scope(|scope| {
            while let Some(item) = walk.next() {
                let entry = match item {
                    Ok(entry) => entry,
                    Err(err) => {
                        log::warn!("Error accessing {err}");
                        Counters::bump(&counters.errors);
                        continue;
                    }
                };
                Counters::bump(&counters.entries);

                if self.matcher.check_exclude(&entry.path) {
                    log::debug!("Skipping excluded path: {}", entry.path);
                    Counters::bump(&counters.excluded);
                    if entry.is_dir {
                        walk.skip_current_dir();
                    }
                    continue;
                }

                if entry.is_dir {
                    if self.opts.max_depth.is_some_and(|max| entry.depth >= max) {
                        walk.skip_current_dir();
                    }
                    continue;
                }

                if self.opts.max_depth.is_some_and(|max| entry.depth > max) {
                    continue;
                }
                if !self.matcher.check_dir(&entry.path) {
                    continue;
                }
                if !self.matcher.check_extension(&entry.name) {
                    continue;
                }
                Counters::bump(&counters.files_considered);

                if !has_filename_terms && !has_content_terms {
                    self.handle_match(&entry, MatchReason::ExtensionAll, dispatch, counters);
                    continue;
                }
                if has_filename_terms && self.matcher.check_filename(&entry.name) {
                    self.handle_match(&entry, MatchReason::Filename, dispatch, counters);
                    continue;
                }
                if !has_content_terms {
                    continue;
                }

                // Blocks the walk while the budget is exhausted.
                let permit = self.budget.acquire();
                Counters::bump(&counters.content_checks);
                scope.spawn(move || {
                    let _permit = permit;
                    if let Some(snippet) = self.content_match(&entry) {
                        self.handle_match(&entry, MatchReason::Content(snippet), dispatch, counters);
                    }
                });
            }
        });
    }

    /// Open, extract and match one candidate. Failures count as no match.
    fn content_match(&self, entry: &WalkEntry) -> Option<String> {
        let reader = match self.fs.open(&entry.path) {
            Ok(reader) => reader,
            Err(err) => {
                log::debug!("Cannot open {}: {err}", entry.path);
                return None;
            }
        };

        let mut bounded = reader.take(MAX_CONTENT_BYTES);
        let text = match extract::extract_text(&mut bounded, &entry.name) {
            Ok(text) => text,
            Err(err) => {
                log::debug!("Cannot extract {}: {err}", entry.path);
                return None;
            }
        };

        self.matcher.check_content(&text)
    }

    fn handle_match(
        &self,
        entry: &WalkEntry,
        reason: MatchReason,
        dispatch: &Dispatch,
        counters: &Counters,
    ) {
        log::info!("Match found ({reason}): {}", entry.path);
        Counters::bump(&counters.matches);

        match dispatch {
            Dispatch::Report => {
                let mut result = MatchResult::new(&entry.path, reason, &self.origin);
                result.size = entry.size;
                if let Err(err) = self.sink.record(result) {
                    log::warn!("Failed to record match for {}: {err}", entry.path);
                }
            }
            Dispatch::Queue(tx) => {
                let job = DownloadJob {
                    path: entry.path.clone(),
                    reason,
                };
                if tx.send(job).is_err() {
                    log::error!("Download queue closed; dropping {}", entry.path);
                    Counters::bump(&counters.errors);
                }
            }
        }
    }
}
