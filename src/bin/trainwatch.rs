//! Trainwatch
//!
//! Reads JSON-lines telemetry from a file or stdin and prints operator notices
//! to the console until the telemetry ends.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use trainwatch::telemetry::JsonLinesSource;
use trainwatch::{Monitor, NotifierConfig, Sinks, WatchConfig, WatchResult, Watcher, WatcherConfig};

/// Command-line configuration
struct Args {
    /// Settings document; defaults apply when absent
    settings: Option<PathBuf>,
    /// Telemetry file; stdin when absent
    telemetry: Option<PathBuf>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        settings: None,
        telemetry: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--settings" | "-s" => {
                if i + 1 < args.len() {
                    parsed.settings = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --settings requires a value");
                    std::process::exit(1);
                }
            }
            "--telemetry" | "-t" => {
                if i + 1 < args.len() {
                    parsed.telemetry = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --telemetry requires a value");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                println!("trainwatch - player train monitor");
                println!();
                println!("USAGE:");
                println!("    trainwatch [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -s, --settings <FILE>     JSON settings document [default: built-in defaults]");
                println!("    -t, --telemetry <FILE>    JSON-lines telemetry [default: stdin]");
                println!("    -h, --help                Print help information");
                println!();
                println!("Log level is controlled with RUST_LOG (default: info).");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
    }

    parsed
}

fn run(args: Args) -> WatchResult<()> {
    let cfg = match &args.settings {
        Some(path) => {
            info!("loading settings from {}", path.display());
            WatchConfig::load(path)?
        }
        None => WatchConfig::default(),
    };

    let reader: Box<dyn BufRead + Send> = match &args.telemetry {
        Some(path) => {
            let file = File::open(path).map_err(trainwatch::TelemetryError::from)?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let monitor = Arc::new(Monitor::new(cfg, Sinks::console_only(), None, &NotifierConfig::default())?);
    let watcher = Watcher::start(
        Arc::clone(&monitor),
        Box::new(JsonLinesSource::new(reader)),
        &WatcherConfig::default(),
    )?;
    info!("monitoring started");

    watcher.wait_for_source();
    monitor.flush(Duration::from_secs(5));
    watcher.shutdown();

    let notifier = monitor.dispatcher().notifier();
    info!(
        "monitoring stopped: {} delivered, {} failed, {} dropped",
        notifier.delivered(),
        notifier.failed(),
        notifier.dropped()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();
    if let Err(e) = run(args) {
        error!("{e}");
        std::process::exit(1);
    }
}
