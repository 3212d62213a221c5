use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vmnet_conf::settings::{load_settings, Settings, SettingsKey};

mod cli;
mod dhcp_cmd;
mod leases_cmd;
mod lookup_cmd;
mod map_cmd;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match &cli.config {
        Some(path) => {
            let settings = load_settings(path)?;
            debug!(path = %path.display(), ?settings, "loaded settings");
            settings
        }
        None => Settings::default(),
    };

    match cli.command {
        Command::Dhcp(args) => dhcp_cmd::run_dhcp(args, &settings),
        Command::Netmap(args) => map_cmd::run_netmap(args, &settings),
        Command::Networking(args) => map_cmd::run_networking(args, &settings),
        Command::Leases(args) => leases_cmd::run_leases(args, &settings),
        Command::Lookup(args) => lookup_cmd::run_lookup(args, &settings),
    }
}

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` applies unless `-v` is given.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The explicit path, else the configured one.
fn input_path(settings: &Settings, explicit: Option<&Path>, key: SettingsKey) -> Result<PathBuf> {
    settings.resolve(explicit, key).with_context(|| {
        format!(
            "no {} file given; pass a path or set `{}` in the --config file",
            key.name(),
            key.name()
        )
    })
}

/// Open `path` and hand it to a reader, attaching the path to any failure.
fn parse_input<T, E>(path: &Path, read: impl FnOnce(File) -> Result<T, E>) -> Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    debug!(path = %path.display(), "reading input");
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read(file).with_context(|| format!("failed to parse {}", path.display()))
}
