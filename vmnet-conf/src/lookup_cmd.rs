use anyhow::{bail, Context, Result};
use vmnet_conf::lookup::{find_bindings, BindingSources};
use vmnet_conf::report::render_bindings;
use vmnet_conf::settings::{Settings, SettingsKey};
use vmnet_conf_core::{
    read_apple_leases, read_dhcp_config, read_isc_leases, read_networking_config, MacAddr,
};

use crate::cli::{LookupArgs, OutputFormat};

pub fn run_lookup(args: LookupArgs, settings: &Settings) -> Result<()> {
    let mac: MacAddr = args
        .mac
        .parse()
        .with_context(|| format!("invalid hardware address {}", args.mac))?;

    let dhcp = settings
        .resolve(args.dhcpd_conf.as_deref(), SettingsKey::DhcpdConf)
        .map(|path| crate::parse_input(&path, read_dhcp_config))
        .transpose()?;
    let networking = settings
        .resolve(args.networking.as_deref(), SettingsKey::Networking)
        .map(|path| crate::parse_input(&path, read_networking_config))
        .transpose()?;
    let isc_leases = settings
        .resolve(args.dhcpd_leases.as_deref(), SettingsKey::DhcpdLeases)
        .map(|path| crate::parse_input(&path, read_isc_leases))
        .transpose()?;
    let apple_leases = settings
        .resolve(args.apple_leases.as_deref(), SettingsKey::AppleLeases)
        .map(|path| crate::parse_input(&path, read_apple_leases))
        .transpose()?;

    let sources = BindingSources {
        dhcp: dhcp.as_ref(),
        networking: networking.as_ref(),
        isc_leases: isc_leases.as_ref(),
        apple_leases: apple_leases.as_ref(),
    };
    if sources.dhcp.is_none()
        && sources.networking.is_none()
        && sources.isc_leases.is_none()
        && sources.apple_leases.is_none()
    {
        bail!("no files to search; pass --dhcpd-conf, --networking, --dhcpd-leases or --apple-leases, or set them in the --config file");
    }

    let bindings = find_bindings(mac, &sources);
    if bindings.is_empty() {
        bail!("no address is bound to {mac}");
    }
    match args.format {
        OutputFormat::Text => println!("{}", render_bindings(&bindings)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&bindings)?),
    }
    Ok(())
}
