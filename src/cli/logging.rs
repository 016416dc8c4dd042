//! Logger setup for the binary.
//!
//! `RUST_LOG` always wins over the computed default level.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Writes every log line to stderr and appends it to a file.
struct Tee {
    file: File,
    stderr: io::Stderr,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stderr.write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stderr.flush()?;
        self.file.flush()
    }
}

/// Install the global logger: `info` by default, `debug` when `verbose`.
///
/// If `log_file` cannot be opened, logging continues on stderr alone and the
/// failure is reported as the first warning.
pub fn init(verbose: bool, log_file: Option<&Path>) -> io::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    let mut open_failure = None;
    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(Tee {
                    file,
                    stderr: io::stderr(),
                })));
            }
            Err(err) => open_failure = Some((path, err)),
        }
    }

    builder.try_init().map_err(io::Error::other)?;
    if let Some((path, err)) = open_failure {
        log::warn!(
            "Cannot open log file {}: {err}; logging to stderr only",
            path.display()
        );
    }
    Ok(())
}
