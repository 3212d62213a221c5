//! Parsers and query models for virtual-network configuration files.
//!
//! Five formats are understood: `dhcpd.conf`, `netmap.conf`, the versioned
//! `networking` command log, ISC `dhcpd.leases` and Apple `dhcpd_leases`.
//! Every reader takes any [`std::io::Read`] handle and consumes it to the end.

pub mod dhcp;
pub mod filter;
pub mod hwaddr;
pub mod lease;
pub mod mapper;
pub mod netmap;
pub mod networking;
pub mod token;

pub use dhcp::{
    parse_dhcp_config, read_dhcp_config, ConfigDeclaration, DeclarationId, DhcpConfigError,
    DhcpConfiguration, Grant, Parameter,
};
pub use hwaddr::{MacAddr, MacAddrParseError};
pub use lease::{
    read_apple_leases, read_isc_leases, AppleLease, IscLease, LeaseError, LeaseErrors, LeaseFile,
};
pub use mapper::{LookupError, NetworkNameMapper};
pub use netmap::{read_network_map, NetworkMap, NetworkMapError};
pub use networking::{
    read_networking_config, read_networking_config_with, Command, NetworkType, NetworkingConfig,
    NetworkingError,
};
