use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use vmnet_conf::report::{render_network_map, render_networking};
use vmnet_conf::settings::{Settings, SettingsKey};
use vmnet_conf_core::{
    read_network_map, read_networking_config, NetworkNameMapper, NetworkType, NetworkingConfig,
};

use crate::cli::{MapArgs, OutputFormat};

pub fn run_netmap(args: MapArgs, settings: &Settings) -> Result<()> {
    let path = crate::input_path(settings, args.file.as_deref(), SettingsKey::Netmap)?;
    let map = crate::parse_input(&path, read_network_map)?;

    if print_lookup(&map, &args)? {
        return Ok(());
    }
    match args.format {
        OutputFormat::Text => println!("{}", render_network_map(&map)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&map)?),
    }
    Ok(())
}

pub fn run_networking(args: MapArgs, settings: &Settings) -> Result<()> {
    let path = crate::input_path(settings, args.file.as_deref(), SettingsKey::Networking)?;
    let config = crate::parse_input(&path, read_networking_config)?;

    if print_lookup(&config, &args)? {
        return Ok(());
    }
    match args.format {
        OutputFormat::Text => println!("{}", render_networking(&config)),
        OutputFormat::Json => {
            let report = NetworkingReport {
                networks: config.network_types(),
                config: &config,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct NetworkingReport<'a> {
    networks: BTreeMap<u32, NetworkType>,
    #[serde(flatten)]
    config: &'a NetworkingConfig,
}

/// Answer `--name`/`--device` if either was given. Returns whether it did.
fn print_lookup(mapper: &dyn NetworkNameMapper, args: &MapArgs) -> Result<bool> {
    if let Some(name) = &args.name {
        let devices = mapper.name_into_devices(name)?;
        match args.format {
            OutputFormat::Text => println!("{}", devices.join("\n")),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&devices)?),
        }
        return Ok(true);
    }
    if let Some(device) = &args.device {
        let name = mapper.device_into_name(device)?;
        match args.format {
            OutputFormat::Text => println!("{name}"),
            OutputFormat::Json => println!("{}", serde_json::to_string(&name)?),
        }
        return Ok(true);
    }
    Ok(false)
}
