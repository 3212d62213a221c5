use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use vmnet_conf_core::networking::DEVICE_PREFIX;
use vmnet_conf_core::{
    AppleLease, DhcpConfiguration, IscLease, LeaseFile, MacAddr, NetworkingConfig,
};

/// Where a MAC-to-IP binding was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingSource {
    DhcpConfig,
    Networking,
    IscLease,
    AppleLease,
}

impl Display for BindingSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindingSource::DhcpConfig => "dhcpd.conf",
            BindingSource::Networking => "networking",
            BindingSource::IscLease => "dhcpd.leases",
            BindingSource::AppleLease => "dhcpd_leases",
        })
    }
}

/// One address bound to the requested hardware address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacBinding {
    pub source: BindingSource,
    pub address: String,
    /// Host name, device or lease label the binding came from.
    pub origin: String,
}

impl Display for MacBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.address, self.source, self.origin)
    }
}

/// Parsed inputs to search; absent ones are skipped.
#[derive(Debug, Default)]
pub struct BindingSources<'a> {
    pub dhcp: Option<&'a DhcpConfiguration>,
    pub networking: Option<&'a NetworkingConfig>,
    pub isc_leases: Option<&'a LeaseFile<IscLease>>,
    pub apple_leases: Option<&'a LeaseFile<AppleLease>>,
}

/// Every address bound to `mac`, static reservations first.
pub fn find_bindings(mac: MacAddr, sources: &BindingSources<'_>) -> Vec<MacBinding> {
    let mut found = Vec::new();

    if let Some(config) = sources.dhcp {
        for decl in config.iter().filter(|decl| decl.hardware().ok() == Some(mac)) {
            if let Ok(address) = decl.ip4() {
                found.push(MacBinding {
                    source: BindingSource::DhcpConfig,
                    address: address.to_string(),
                    origin: decl.id().to_string(),
                });
            }
        }
    }

    if let Some(networking) = sources.networking {
        let key = mac.to_string();
        for (network, table) in networking.dhcp_mac_to_ip() {
            if let Some(address) = table.get(&key) {
                found.push(MacBinding {
                    source: BindingSource::Networking,
                    address: address.to_string(),
                    origin: format!("{DEVICE_PREFIX}{network}"),
                });
            }
        }
    }

    if let Some(leases) = sources.isc_leases {
        for lease in leases.entries.iter().filter(|l| l.hardware_addr() == Some(mac)) {
            found.push(MacBinding {
                source: BindingSource::IscLease,
                address: lease.address.clone(),
                origin: lease
                    .ends
                    .map(|ends| format!("ends {ends}"))
                    .unwrap_or_else(|| "lease".to_string()),
            });
        }
    }

    if let Some(leases) = sources.apple_leases {
        for lease in leases.entries.iter().filter(|l| l.hardware_addr() == Some(mac)) {
            if let Some(address) = &lease.ip_address {
                found.push(MacBinding {
                    source: BindingSource::AppleLease,
                    address: address.clone(),
                    origin: lease.name.clone().unwrap_or_else(|| "lease".to_string()),
                });
            }
        }
    }

    found
}
