use anyhow::{Context, Result};
use serde::Serialize;
use vmnet_conf::report::{render_apple_leases, render_isc_leases};
use vmnet_conf::settings::{Settings, SettingsKey};
use vmnet_conf_core::{read_apple_leases, read_isc_leases, LeaseFile};

use crate::cli::{Dialect, LeasesArgs, OutputFormat};

/// Print every readable entry, then fail if any block was malformed.
pub fn run_leases(args: LeasesArgs, settings: &Settings) -> Result<()> {
    let key = match args.dialect {
        Dialect::Isc => SettingsKey::DhcpdLeases,
        Dialect::Apple => SettingsKey::AppleLeases,
    };
    let path = crate::input_path(settings, args.file.as_deref(), key)?;

    let checked = match args.dialect {
        Dialect::Isc => {
            let leases = crate::parse_input(&path, read_isc_leases)?;
            emit(&leases, args.format, render_isc_leases)?;
            leases.check()
        }
        Dialect::Apple => {
            let leases = crate::parse_input(&path, read_apple_leases)?;
            emit(&leases, args.format, render_apple_leases)?;
            leases.check()
        }
    };
    checked.with_context(|| format!("{} has malformed entries", path.display()))
}

fn emit<T: Serialize>(
    leases: &LeaseFile<T>,
    format: OutputFormat,
    render: fn(&LeaseFile<T>) -> String,
) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", render(leases)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(leases)?),
    }
    Ok(())
}
