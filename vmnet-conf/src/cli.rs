use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "vmnet-conf")]
#[command(about = "Inspect virtual-network DHCP, netmap and networking configuration files")]
pub struct Cli {
    /// Optional TOML settings file with default file locations.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log parser progress to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Parse a dhcpd.conf and print resolved declarations.
    Dhcp(DhcpArgs),
    /// Parse a netmap.conf and print rows or a lookup.
    Netmap(MapArgs),
    /// Replay a networking log and print its tables.
    Networking(MapArgs),
    /// Read a lease file and print its entries.
    Leases(LeasesArgs),
    /// Find every address bound to a hardware address.
    Lookup(LookupArgs),
}

#[derive(Parser, Debug)]
pub struct DhcpArgs {
    /// dhcpd.conf to read. Defaults to `dhcpd_conf` from the settings file.
    pub file: Option<PathBuf>,
    /// Show only the subnet containing this address.
    #[arg(long, conflicts_with_all = ["host", "global"])]
    pub subnet: Option<std::net::IpAddr>,
    /// Show only the host declaration with this name.
    #[arg(long, conflicts_with = "global")]
    pub host: Option<String>,
    /// Show only the global declaration.
    #[arg(long)]
    pub global: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct MapArgs {
    /// File to read. Defaults to the matching entry of the settings file.
    pub file: Option<PathBuf>,
    /// Print the devices of this network name.
    #[arg(long, conflicts_with = "device")]
    pub name: Option<String>,
    /// Print the network name of this device.
    #[arg(long)]
    pub device: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct LeasesArgs {
    /// Lease file to read. Defaults to the settings entry of the dialect.
    pub file: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Dialect::Isc)]
    pub dialect: Dialect,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct LookupArgs {
    /// Hardware address to search for.
    #[arg(long)]
    pub mac: String,
    #[arg(long)]
    pub dhcpd_conf: Option<PathBuf>,
    #[arg(long)]
    pub networking: Option<PathBuf>,
    #[arg(long)]
    pub dhcpd_leases: Option<PathBuf>,
    #[arg(long)]
    pub apple_leases: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum Dialect {
    /// ISC dhcpd `dhcpd.leases`.
    Isc,
    /// macOS bootpd `dhcpd_leases`.
    Apple,
}
