//! Download pipeline: turns queued matches into loot files plus report records.
//!
//! Bytes are streamed into a hidden staging file beside the destination while
//! being hashed. The Dedup Store then decides whether the staged copy is moved
//! into place or discarded; a hash only counts as captured once its copy has
//! been moved into place. A report record is produced for every job,
//! including failed ones (without a hash).

use crate::models::{DownloadJob, MatchResult, Origin};
use crate::services::dedup::{Claim, DedupStore};
use crate::services::fs::FileSystem;
use crate::services::sink::ReportSink;
use crate::LootLayout;
use crossbeam_channel::Receiver;
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

/// Fixed number of download workers per walk
pub const DOWNLOAD_WORKERS: usize = 2;

/// Capacity of the queue between matching and downloading
pub const DOWNLOAD_QUEUE_CAPACITY: usize = 100;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Strip separators and colons so a host or share name is one path component.
#[must_use]
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':'))
        .collect()
}

/// Flatten a whole path into one file name.
#[must_use]
pub fn flat_name(path: &str) -> String {
    path.chars()
        .filter(|c| *c != ':')
        .map(|c| if c == '\\' || c == '/' { '_' } else { c })
        .collect()
}

/// Where the loot copy of `path` is placed.
#[must_use]
pub fn loot_path(loot_dir: &Path, layout: LootLayout, origin: &Origin, path: &str) -> PathBuf {
    match layout {
        LootLayout::Flat => loot_dir.join(flat_name(path)),
        LootLayout::Structured => {
            let mut dest = loot_dir
                .join(sanitize_component(&origin.host))
                .join(sanitize_component(&origin.share));
            let unified = path.replace('\\', "/");
            for component in Path::new(&unified).components() {
                if let Component::Normal(part) = component {
                    dest.push(part);
                }
            }
            dest
        }
    }
}

/// Outcome of one successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub hash: String,
    pub size: u64,
    pub destination: PathBuf,
    /// Content was already captured this run; nothing was kept on disk.
    pub duplicate: bool,
}

/// Per-worker totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadTally {
    pub downloads: u64,
    pub duplicates: u64,
    pub failures: u64,
}

impl DownloadTally {
    fn add(self, other: DownloadTally) -> Self {
        Self {
            downloads: self.downloads + other.downloads,
            duplicates: self.duplicates + other.duplicates,
            failures: self.failures + other.failures,
        }
    }
}

impl std::iter::Sum for DownloadTally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Self::add)
    }
}

/// Fetches matched files of one walk into the loot directory.
pub struct Downloader<'a> {
    fs: &'a dyn FileSystem,
    dedup: &'a DedupStore,
    loot_dir: &'a Path,
    layout: LootLayout,
    origin: &'a Origin,
}

impl<'a> Downloader<'a> {
    #[must_use]
    pub fn new(
        fs: &'a dyn FileSystem,
        dedup: &'a DedupStore,
        loot_dir: &'a Path,
        layout: LootLayout,
        origin: &'a Origin,
    ) -> Self {
        Self {
            fs,
            dedup,
            loot_dir,
            layout,
            origin,
        }
    }

    /// Copy one file into loot, keeping it only if its content is new.
    pub fn fetch(&self, path: &str) -> io::Result<Fetched> {
        let destination = loot_path(self.loot_dir, self.layout, self.origin, path);
        let parent = destination.parent().unwrap_or(self.loot_dir);
        std::fs::create_dir_all(parent)?;

        let mut source = self.fs.open(path)?;
        // Dropped (and removed) on any early return below.
        let mut staged = tempfile::Builder::new()
            .prefix(".")
            .suffix(".part")
            .tempfile_in(parent)?;
        let (hash, size) = copy_hashed(&mut source, staged.as_file_mut())?;

        let reservation = match self.dedup.claim(&hash) {
            Claim::New(reservation) => reservation,
            Claim::Duplicate => {
                log::info!(
                    "Duplicate file detected (Hash: {}), removing: {}",
                    short_hash(&hash),
                    destination.display()
                );
                staged.close()?;
                return Ok(Fetched {
                    hash,
                    size,
                    destination,
                    duplicate: true,
                });
            }
        };

        // A failed persist drops the reservation, so a later file with the
        // same content is kept instead.
        staged.persist(&destination).map_err(|e| e.error)?;
        reservation.confirm();
        log::info!(
            "Downloaded to: {} [Hash: {}]",
            destination.display(),
            short_hash(&hash)
        );
        Ok(Fetched {
            hash,
            size,
            destination,
            duplicate: false,
        })
    }

    /// Process jobs until the queue is closed and empty.
    pub fn drain(&self, jobs: &Receiver<DownloadJob>, sink: &dyn ReportSink) -> DownloadTally {
        let mut tally = DownloadTally::default();

        for job in jobs {
            let mut result = MatchResult::new(&job.path, job.reason, self.origin);
            match self.fetch(&job.path) {
                Ok(fetched) => {
                    if fetched.duplicate {
                        tally.duplicates += 1;
                    } else {
                        tally.downloads += 1;
                    }
                    result.hash = Some(fetched.hash);
                    result.size = Some(fetched.size);
                }
                Err(err) => {
                    log::debug!("Download failed for {}: {err}", job.path);
                    tally.failures += 1;
                }
            }

            if let Err(err) = sink.record(result) {
                log::warn!("Failed to record match for {}: {err}", job.path);
            }
        }

        tally
    }
}

/// Stream `reader` into `writer`, returning the hex SHA-256 and byte count.
pub fn copy_hashed<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
) -> io::Result<(String, u64)> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;

    Ok((hex::encode(hasher.finalize()), total))
}

fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}
