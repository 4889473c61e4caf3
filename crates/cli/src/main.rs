//! Directory coherence simulator CLI.
//!
//! This binary provides a single entry point for the coherence engine. It performs:
//! 1. **Trace run:** Build a multi-tile machine, replay a JSON trace, and print statistics.
//! 2. **Scheme listing:** Print the sharer-tracking schemes accepted by the configuration.
//! 3. **Config check:** Validate a configuration file and summarize it.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tilesim_coherence::Config;
use tilesim_coherence::common::SimError;
use tilesim_coherence::directory::DirectoryType;
use tilesim_coherence::sim::{System, TraceRecord};

#[derive(Parser, Debug)]
#[command(
    name = "tilesim",
    author,
    version,
    about = "Directory-based cache coherence simulator",
    long_about = "Replay memory traces through a tiled machine with private caches and home directory controllers.\n\nExamples:\n  tilesim run --trace trace.json\n  tilesim run --config ackwise.json --trace trace.json --json\n  tilesim check-config ackwise.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace and print aggregated directory statistics.
    Run {
        /// Configuration file (JSON). Built-in defaults when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Trace file (JSON array of `{tile, op, address, value}` records).
        #[arg(short, long)]
        trace: PathBuf,

        /// Print statistics as JSON.
        #[arg(long)]
        json: bool,

        /// Log filter used when `RUST_LOG` is unset (e.g. `debug`, `tilesim_coherence=trace`).
        #[arg(long, default_value = "warn")]
        log_level: String,
    },

    /// List the directory scheme names accepted by the configuration.
    Schemes,

    /// Validate a configuration file.
    CheckConfig {
        /// Configuration file (JSON).
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            trace,
            json,
            log_level,
        } => {
            init_logging(&log_level);
            cmd_run(config, &trace, json)
        }
        Commands::Schemes => {
            cmd_schemes();
            Ok(())
        }
        Commands::CheckConfig { path } => cmd_check_config(&path),
    };

    if let Err(e) = result {
        eprintln!("[!] {e}");
        process::exit(1);
    }
}

/// Installs the fmt subscriber; `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<Config, SimError> {
    let config = match path {
        Some(p) => Config::from_file(p)?,
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Replays a trace through a freshly built machine.
///
/// Invariants are checked after every record; the first violation aborts the run.
fn cmd_run(config: Option<PathBuf>, trace: &Path, json: bool) -> Result<(), SimError> {
    let config = load_config(config.as_deref())?;
    let records = TraceRecord::load(trace)?;
    info!(records = records.len(), scheme = %config.directory.directory_type, "replaying trace");

    let mut system = System::new(config)?;
    let reads = system.replay(&records)?;
    system.flush_deferred();
    let _ = system.run_until_idle()?;
    system.check_invariants()?;

    let stats = system.stats();
    if json {
        let text = serde_json::to_string_pretty(&stats).map_err(|e| SimError::Trace(e.to_string()))?;
        println!("{text}");
    } else {
        println!("[*] Replayed {} records ({} reads)", records.len(), reads.len());
        println!("[*] Delivered {} messages", system.network().delivered());
        println!();
        stats.print();
    }
    Ok(())
}

fn cmd_schemes() {
    for scheme in DirectoryType::ALL {
        let note = if scheme.may_broadcast() {
            "may broadcast invalidations"
        } else {
            "exact invalidations"
        };
        println!("{:<22} {note}", scheme.name());
    }
}

fn cmd_check_config(path: &Path) -> Result<(), SimError> {
    let config = load_config(Some(path))?;
    println!("[*] {} is valid", path.display());
    println!(
        "    tiles: {}  line: {} B  scheme: {}",
        config.general.num_tiles, config.general.cache_line_size, config.directory.directory_type
    );
    println!(
        "    directory: {} entries x {} ways per home, homes: {:?}",
        config.directory.total_entries,
        config.directory.associativity,
        config.home_tiles()
    );
    Ok(())
}
