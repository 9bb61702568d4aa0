//! hwprobe - host identity and utilization snapshot
//!
//! Classifies the execution environment, samples CPU counters twice and
//! prints one JSON document on stdout.

use anyhow::Result;
use clap::Parser;
use hwprobe_common::config::Config;
use hwprobe_common::report::{self, IdentityDocument, SnapshotDocument};
use hwprobe_common::{classify, snapshot};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hwprobe")]
#[command(about = "Snapshot host identity, virtualization and CPU/memory usage", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: /etc/hwprobe/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pause between the two sampling passes, in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Read evidence under this directory instead of /
    #[arg(long)]
    root: Option<PathBuf>,

    /// Skip the systemd-detect-virt tier
    #[arg(long)]
    no_helper: bool,

    /// Only classify the host; skip CPU and memory sampling
    #[arg(long)]
    identity_only: bool,

    /// Single-line JSON
    #[arg(long)]
    compact: bool,

    /// Write the default config to this path and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(interval_ms) = self.interval_ms {
            config.sampling.interval_ms = interval_ms;
        }
        if let Some(root) = &self.root {
            config.evidence.root = root.clone();
        }
        if self.no_helper {
            config.evidence.detect_virt_helper = Some(String::new());
        }
        if self.compact {
            config.output.pretty = false;
        }
        config
    }
}

/// An explicit config that fails to load falls back to defaults, like a
/// missing system config does.
fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(path) => Config::load_from_path(path).unwrap_or_else(|e| {
            warn!("Failed to load config {}: {}", path.display(), e);
            Config::default()
        }),
        None => Config::load(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &cli.write_default_config {
        Config::save_default(path)?;
        return Ok(());
    }

    let config = cli.apply(load_config(cli.config.as_deref()));

    info!("hwprobe v{} starting", env!("CARGO_PKG_VERSION"));

    let evidence = config.evidence.reader();
    let json = if cli.identity_only {
        let identity = classify(&evidence);
        report::to_json(&IdentityDocument::from(&identity), config.output.pretty)?
    } else {
        let snapshot = snapshot::capture(&evidence, config.sampling.interval());
        report::to_json(&SnapshotDocument::from(&snapshot), config.output.pretty)?
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}
