//! lootspider - Main binary entry point

use lootspider::Matcher;
use lootspider::cli::args::{Command, RunArgs, parse_args};
use lootspider::cli::{logging, output};
use lootspider::io::state::ResumeState;
use lootspider::services::fs::remote::MountedShareConnector;
use lootspider::services::orchestrator::Orchestrator;
use lootspider::services::sink::jsonl::JsonLinesSink;
use lootspider::services::sink::{NullSink, ReportSink};
use lootspider::services::targets::resolve_targets;
use std::process;
use std::sync::Arc;
use std::time::Instant;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let cli_args = match parse_args(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            process::exit(2);
        }
    };

    let exit_code = match &cli_args.command {
        Command::Help => {
            print_help();
            0
        }
        Command::Version => {
            print_version();
            0
        }
        Command::Run(run_args) => handle_run(run_args),
    };

    process::exit(exit_code);
}

fn handle_run(args: &RunArgs) -> i32 {
    let log_file = args.log_file_path();
    if let Err(e) = logging::init(args.debug_logging(), log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    eprintln!("{}", output::banner());
    log::info!("lootspider starting...");
    if args.analyze {
        log::info!("Analyze mode enabled: downloads disabled, debug logging on");
    }
    if args.no_pass {
        log::debug!("Using --no-pass, ignoring any provided password");
    }
    if args.no_exclude {
        log::warn!("Disabling default exclusions");
    }

    let matcher = match Matcher::new(&args.match_config()) {
        Ok(m) => Arc::new(m),
        Err(e) => {
            eprintln!("Error: {e}");
            return 2;
        }
    };

    let options = args.run_options();
    if let Err(e) = options.credentials.auth_method() {
        eprintln!("Error: {e}");
        return 2;
    }

    let resume = match args.resume_path() {
        Some(path) => match ResumeState::load(&path) {
            Ok(state) => {
                log::info!("Resume mode enabled. Loaded state from {}", path.display());
                Some(Arc::new(state))
            }
            Err(e) => {
                eprintln!("Error: failed to read resume file {}: {e}", path.display());
                return 4;
            }
        },
        None => None,
    };

    let targets = match resolve_targets(&args.targets, resume.as_deref()) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {e}");
            return 2;
        }
    };
    if targets.is_empty() {
        log::info!("Nothing to do: every target is already completed");
        return 0;
    }

    let sink: Arc<dyn ReportSink> = match &args.output {
        Some(path) => {
            let opened = if resume.is_some() {
                JsonLinesSink::append(path)
            } else {
                JsonLinesSink::create(path)
            };
            match opened {
                Ok(s) => Arc::new(s),
                Err(e) => {
                    eprintln!("Error: failed to open output file {path}: {e}");
                    return 4;
                }
            }
        }
        None => Arc::new(NullSink),
    };

    let mut orchestrator = Orchestrator::new(options, matcher, sink);
    if let Some(state) = resume {
        orchestrator = orchestrator.with_resume(state);
    }
    if let Some(root) = &args.mount_root {
        orchestrator = orchestrator.with_connector(Arc::new(MountedShareConnector::new(root)));
    }

    let started = Instant::now();
    let summary = match orchestrator.run(&targets) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return 4;
        }
    };

    eprint!("{}", output::format_summary(&summary, started.elapsed()));

    if summary.failed.is_empty() {
        0
    } else {
        3 // Partial failure
    }
}

fn print_help() {
    println!("{}", output::banner());
    println!();
    println!("USAGE:");
    println!("    lootspider [OPTIONS] <TARGET>...");
    println!();
    println!("TARGETS:");
    println!("    Host name or IP          Remote host whose shares are spidered");
    println!("    CIDR range               Every address in the range (e.g. 10.0.0.0/24)");
    println!("    File                     One target per line; '#' starts a comment");
    println!("    Directory                Local directory tree");
    println!();
    println!("AUTHENTICATION:");
    println!("    -u, --username <USER>      Username");
    println!("    -p, --password <PASS>      Password");
    println!("    -d, --domain <DOMAIN>      Domain");
    println!("    -H, --hash <HASH>          NTLM hash (NT or LM:NT)");
    println!("        --ccache <FILE>        Kerberos credential cache (not supported)");
    println!("        --no-pass              Use an empty password");
    println!();
    println!("FILTERS:");
    println!("    -f, --filenames <REGEX>    Match file names (repeatable)");
    println!("    -e, --extensions <LIST>    Only consider these extensions (comma-separated)");
    println!("    -c, --content <REGEX>      Match file content (repeatable)");
    println!("        --preset <LIST>        Content presets: aws, azure, slack, keys, google, auth");
    println!("        --dirnames <REGEX>     Only files whose path matches (repeatable)");
    println!("        --sharenames <LIST>    Scan these shares instead of listing them");
    println!("        --exclude <TEXT>       Skip paths containing TEXT (repeatable)");
    println!("        --no-exclude           Disable the default exclusions");
    println!();
    println!("OPTIONS:");
    println!("    -t, --threads <N>          Concurrent content checks per host (default: 5)");
    println!("    -P, --parallel <N>         Concurrent targets (default: 5)");
    println!("    -m, --maxdepth <N>         Maximum depth, 0 for unlimited (default: 10)");
    println!("    -l, --loot-dir <DIR>       Loot directory (default: .lootspider/loot)");
    println!("    -S, --structured           Lay loot out as <host>/<share>/<path>");
    println!("    -n, --no-download          Report matches without downloading");
    println!("    -A, --analyze              No downloads, debug logging, log to file");
    println!("    -o, --output <FILE>        Write matches as JSON lines");
    println!("        --resume <FILE>        Skip targets completed in FILE and record new ones");
    println!("        --mount-root <DIR>     Shares are mounted at <DIR>/<host>/<share>");
    println!("        --timeout <SECS>       Share I/O timeout");
    println!("        --log-file <FILE>      Also append log output to FILE");
    println!("    -v, --verbose              Debug logging");
    println!("    -h, --help                 Show this help message");
    println!("    -V, --version              Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    lootspider /srv/share -c password -n");
    println!("    lootspider 10.0.0.0/24 -u alice -p secret --mount-root /mnt/smb --preset keys");
    println!("    lootspider targets.txt --resume state.json -o matches.jsonl -S");
}

fn print_version() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_DATE: &str = env!("GIT_DATE");
    const BUILD_TARGET: &str = env!("BUILD_TARGET");

    println!("lootspider {VERSION}");
    println!("Commit: {GIT_HASH} ({GIT_DATE})");
    println!("Target: {BUILD_TARGET}");

    #[cfg(debug_assertions)]
    println!("Build: debug");
    #[cfg(not(debug_assertions))]
    println!("Build: release");
}
