//! CLI argument parsing

use crate::services::fs::remote::Credentials;
use crate::services::orchestrator::RunOptions;
use crate::{DEFAULT_LOOT_DIR, LootLayout, MatchConfig, ScanOptions};
use std::path::PathBuf;
use std::time::Duration;

/// Log file written in analyze mode when `--log-file` is not given
pub const DEFAULT_LOG_FILE: &str = "lootspider.log";

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub command: Command,
}

#[derive(Debug, Clone)]
pub enum Command {
    Run(RunArgs),
    Help,
    Version,
}

#[derive(Debug, Clone)]
pub struct RunArgs {
    pub targets: Vec<String>,

    pub username: String,
    pub password: String,
    pub domain: String,
    pub hash: Option<String>,
    pub ccache: Option<String>,
    pub no_pass: bool,

    pub filenames: Vec<String>,
    pub extensions: Vec<String>,
    pub content: Vec<String>,
    pub share_names: Vec<String>,
    pub dirnames: Vec<String>,
    pub presets: Vec<String>,
    pub excludes: Vec<String>,
    pub no_exclude: bool,

    pub threads: usize,
    pub parallel: usize,
    /// `None` means unlimited (`--maxdepth 0`)
    pub max_depth: Option<usize>,
    pub analyze: bool,
    pub loot_dir: String,
    pub structured: bool,
    pub no_download: bool,
    pub output: Option<String>,
    pub resume: Option<String>,
    pub mount_root: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<String>,
    pub verbose: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            username: String::new(),
            password: String::new(),
            domain: String::new(),
            hash: None,
            ccache: None,
            no_pass: false,
            filenames: Vec::new(),
            extensions: Vec::new(),
            content: Vec::new(),
            share_names: Vec::new(),
            dirnames: Vec::new(),
            presets: Vec::new(),
            excludes: Vec::new(),
            no_exclude: false,
            threads: 5,
            parallel: 5,
            max_depth: Some(10),
            analyze: false,
            loot_dir: DEFAULT_LOOT_DIR.to_string(),
            structured: false,
            no_download: false,
            output: None,
            resume: None,
            mount_root: None,
            timeout_secs: None,
            log_file: None,
            verbose: false,
        }
    }
}

impl RunArgs {
    /// Downloads are off in analyze mode.
    #[must_use]
    pub fn download(&self) -> bool {
        !self.no_download && !self.analyze
    }

    #[must_use]
    pub fn debug_logging(&self) -> bool {
        self.verbose || self.analyze
    }

    /// Log file to tee into, if any
    #[must_use]
    pub fn log_file_path(&self) -> Option<PathBuf> {
        match &self.log_file {
            Some(path) => Some(PathBuf::from(path)),
            None if self.analyze => Some(PathBuf::from(DEFAULT_LOG_FILE)),
            None => None,
        }
    }

    #[must_use]
    pub fn resume_path(&self) -> Option<PathBuf> {
        self.resume.as_ref().map(PathBuf::from)
    }

    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: if self.no_pass {
                String::new()
            } else {
                self.password.clone()
            },
            domain: self.domain.clone(),
            ntlm_hash: self.hash.clone(),
            ccache: self.ccache.as_ref().map(PathBuf::from),
        }
    }

    #[must_use]
    pub fn match_config(&self) -> MatchConfig {
        let mut config = MatchConfig {
            filenames: self.filenames.clone(),
            extensions: self.extensions.clone(),
            content: self.content.clone(),
            dirnames: self.dirnames.clone(),
            presets: self.presets.clone(),
            ..MatchConfig::default()
        };
        if self.no_exclude {
            config = config.without_excludes();
        }
        config.excludes.extend(self.excludes.iter().cloned());
        config
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            concurrent_hosts: self.parallel,
            share_names: self.share_names.clone(),
            credentials: self.credentials(),
            io_timeout: self.timeout_secs.map(Duration::from_secs),
            scan: ScanOptions {
                max_depth: self.max_depth,
                threads: self.threads,
                loot_dir: PathBuf::from(&self.loot_dir),
                download: self.download(),
                layout: if self.structured {
                    LootLayout::Structured
                } else {
                    LootLayout::Flat
                },
            },
        }
    }
}

/// Parse command line arguments (including the program name)
pub fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let rest = args.get(1..).unwrap_or_default();
    if rest.is_empty() {
        return Ok(CliArgs {
            command: Command::Help,
        });
    }

    let mut run = RunArgs::default();
    let mut i = 0;

    while i < rest.len() {
        let flag = rest[i].as_str();
        match flag {
            "-h" | "--help" => {
                return Ok(CliArgs {
                    command: Command::Help,
                });
            }
            "-V" | "--version" => {
                return Ok(CliArgs {
                    command: Command::Version,
                });
            }
            "-u" | "--username" => run.username = value(rest, &mut i, flag)?.to_string(),
            "-p" | "--password" => run.password = value(rest, &mut i, flag)?.to_string(),
            "-d" | "--domain" => run.domain = value(rest, &mut i, flag)?.to_string(),
            "-H" | "--hash" => run.hash = Some(value(rest, &mut i, flag)?.to_string()),
            "--ccache" => run.ccache = Some(value(rest, &mut i, flag)?.to_string()),
            "--no-pass" => run.no_pass = true,

            // Regex-valued: repeatable, never split on commas.
            "-f" | "--filenames" => run.filenames.push(value(rest, &mut i, flag)?.to_string()),
            "-c" | "--content" => run.content.push(value(rest, &mut i, flag)?.to_string()),
            "--dirnames" => run.dirnames.push(value(rest, &mut i, flag)?.to_string()),
            "--exclude" => run.excludes.push(value(rest, &mut i, flag)?.to_string()),

            // List-valued: comma-separated and repeatable.
            "-e" | "--extensions" => run.extensions.extend(split_list(value(rest, &mut i, flag)?)),
            "--sharenames" => run.share_names.extend(split_list(value(rest, &mut i, flag)?)),
            "--preset" => run.presets.extend(split_list(value(rest, &mut i, flag)?)),

            "--no-exclude" => run.no_exclude = true,
            "-t" | "--threads" => run.threads = positive(value(rest, &mut i, flag)?, flag)?,
            "-P" | "--parallel" => run.parallel = positive(value(rest, &mut i, flag)?, flag)?,
            "-m" | "--maxdepth" => {
                let depth: usize = value(rest, &mut i, flag)?
                    .parse()
                    .map_err(|_| format!("{flag} must be a number"))?;
                run.max_depth = (depth > 0).then_some(depth);
            }
            "-A" | "--analyze" => run.analyze = true,
            "-l" | "--loot-dir" => run.loot_dir = value(rest, &mut i, flag)?.to_string(),
            "-S" | "--structured" => run.structured = true,
            "-n" | "--no-download" => run.no_download = true,
            "-o" | "--output" => run.output = Some(value(rest, &mut i, flag)?.to_string()),
            "--resume" => run.resume = Some(value(rest, &mut i, flag)?.to_string()),
            "--mount-root" => run.mount_root = Some(value(rest, &mut i, flag)?.to_string()),
            "--timeout" => {
                let secs: u64 = value(rest, &mut i, flag)?
                    .parse()
                    .map_err(|_| format!("{flag} must be a number of seconds"))?;
                run.timeout_secs = (secs > 0).then_some(secs);
            }
            "--log-file" => run.log_file = Some(value(rest, &mut i, flag)?.to_string()),
            "-v" | "--verbose" => run.verbose = true,
            arg if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("Unknown option: {arg}"));
            }
            arg => run.targets.push(arg.to_string()),
        }
        i += 1;
    }

    if run.targets.is_empty() {
        return Err("Missing required argument: TARGET".to_string());
    }

    Ok(CliArgs {
        command: Command::Run(run),
    })
}

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn positive(raw: &str, flag: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("{flag} must be a positive integer")),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
