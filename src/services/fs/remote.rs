//! Remote share collaborator interfaces.
//!
//! The wire protocol lives behind [`ShareConnector`] and [`ShareSession`]. The
//! crate ships one transport, [`MountedShareConnector`], which treats shares
//! already mounted by the operating system under `<root>/<host>/<share>` as
//! the host's shares.

use super::FileSystem;
use super::local::LocalFs;
use crate::{Error, Result};
use crossbeam_channel::RecvTimeoutError;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Share that is never scanned (named pipes, not files)
pub const IPC_SHARE: &str = "IPC$";

/// Credentials as supplied by the operator
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub domain: String,
    /// NTLM hash in `NT` or `LM:NT` hex form
    pub ntlm_hash: Option<String>,
    /// Kerberos credential cache path
    pub ccache: Option<PathBuf>,
}

/// Resolved authentication method handed to a transport
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Password {
        username: String,
        domain: String,
        password: String,
    },
    NtlmHash {
        username: String,
        domain: String,
        hash: [u8; 16],
    },
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Password {
                username, domain, ..
            } => f
                .debug_struct("Password")
                .field("username", username)
                .field("domain", domain)
                .finish_non_exhaustive(),
            AuthMethod::NtlmHash {
                username, domain, ..
            } => f
                .debug_struct("NtlmHash")
                .field("username", username)
                .field("domain", domain)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    /// Pick the authentication method, failing fast on unsupported ones.
    pub fn auth_method(&self) -> Result<AuthMethod> {
        if let Some(ccache) = &self.ccache {
            return Err(Error::UnsupportedAuth(format!(
                "Kerberos authentication via ccache ({}) is not supported; use a password or NTLM hash",
                ccache.display()
            )));
        }

        if let Some(raw) = self.ntlm_hash.as_deref() {
            return Ok(AuthMethod::NtlmHash {
                username: self.username.clone(),
                domain: self.domain.clone(),
                hash: parse_ntlm_hash(raw)?,
            });
        }

        Ok(AuthMethod::Password {
            username: self.username.clone(),
            domain: self.domain.clone(),
            password: self.password.clone(),
        })
    }
}

/// Decode an NT hash, accepting the `LM:NT` pair form.
pub fn parse_ntlm_hash(raw: &str) -> Result<[u8; 16]> {
    let nt = raw.trim().rsplit(':').next().unwrap_or_default();
    let bytes = hex::decode(nt)
        .map_err(|e| Error::InvalidInput(format!("invalid NTLM hash format: {e}")))?;
    <[u8; 16]>::try_from(bytes.as_slice()).map_err(|_| {
        Error::InvalidInput(format!(
            "invalid NTLM hash length: expected 16 bytes, got {}",
            bytes.len()
        ))
    })
}

/// Authenticated session to one remote host
pub trait ShareSession: Send + Sync {
    /// Names of every share the host exposes.
    ///
    /// A server that refuses unsigned listing should fail with
    /// [`Error::SigningRequired`].
    fn list_shares(&self) -> Result<Vec<String>>;

    /// Mount one share as a filesystem rooted at the share.
    fn mount(&self, share: &str) -> Result<Box<dyn FileSystem>>;
}

/// Share transport: dials and authenticates a host
pub trait ShareConnector: Send + Sync {
    /// Open a session. `timeout` bounds every blocking network operation of
    /// the session; `None` leaves the transport default in place.
    fn connect(
        &self,
        host: &str,
        auth: &AuthMethod,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn ShareSession>>;
}

/// Connector used when no transport was configured
#[derive(Debug, Default)]
pub struct UnavailableConnector;

impl ShareConnector for UnavailableConnector {
    fn connect(
        &self,
        host: &str,
        _auth: &AuthMethod,
        _timeout: Option<Duration>,
    ) -> Result<Box<dyn ShareSession>> {
        Err(Error::Connect(format!(
            "no share transport configured for {host}; mount its shares and pass --mount-root"
        )))
    }
}

/// Shares mounted by the OS under `<root>/<host>/<share>`
#[derive(Debug, Clone)]
pub struct MountedShareConnector {
    root: PathBuf,
}

impl MountedShareConnector {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl ShareConnector for MountedShareConnector {
    fn connect(
        &self,
        host: &str,
        auth: &AuthMethod,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn ShareSession>> {
        let host_dir = self.root.join(host);
        let checked = host_dir.clone();
        let mounted = with_deadline(timeout, format!("connecting to {host}"), move || {
            Ok(checked.is_dir())
        })?;
        if !mounted {
            return Err(Error::Connect(format!(
                "{host} is not mounted under {}",
                self.root.display()
            )));
        }
        log::debug!("Using OS mounts for {host}; authentication ({auth:?}) is handled by the mount");
        Ok(Box::new(MountedSession { host_dir, timeout }))
    }
}

/// Run a blocking filesystem check, giving up after `timeout`.
///
/// A hung network mount blocks in the kernel, so the check runs on a helper
/// thread that is abandoned when the deadline passes. File reads during the
/// walk are not bounded.
fn with_deadline<T, F>(timeout: Option<Duration>, what: String, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let Some(limit) = timeout else {
        return op();
    };

    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::Builder::new()
        .name("lootspider-mount-check".to_string())
        .spawn(move || {
            // The receiver is gone once the deadline has passed.
            let _ = tx.send(op());
        })
        .map_err(|e| Error::System(format!("cannot start mount check: {e}")))?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            log::warn!("Gave up {what} after {limit:?}");
            Err(Error::Connect(format!("{what} timed out after {limit:?}")))
        }
        Err(RecvTimeoutError::Disconnected) => Err(Error::System(format!(
            "{what}: mount check exited without a result"
        ))),
    }
}

struct MountedSession {
    host_dir: PathBuf,
    timeout: Option<Duration>,
}

impl ShareSession for MountedSession {
    fn list_shares(&self) -> Result<Vec<String>> {
        let host_dir = self.host_dir.clone();
        let what = format!("listing shares of {}", self.host_dir.display());
        with_deadline(self.timeout, what, move || list_subdirs(&host_dir))
    }

    fn mount(&self, share: &str) -> Result<Box<dyn FileSystem>> {
        let share_dir = self.host_dir.join(share);
        let checked = share_dir.clone();
        let what = format!("opening share {share}");
        if !with_deadline(self.timeout, what, move || Ok(checked.is_dir()))? {
            return Err(Error::Connect(format!(
                "share {share} not found at {}",
                share_dir.display()
            )));
        }
        Ok(Box::new(LocalFs::rooted(share_dir)))
    }
}

fn list_subdirs(host_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(host_dir)
        .map_err(|e| Error::ShareListing(format!("{}: {e}", host_dir.display())))?;

    let mut shares = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::ShareListing(e.to_string()))?;
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            shares.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    shares.sort();
    Ok(shares)
}
