use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::mapper::{LookupError, NetworkNameMapper};

use super::replay::NetworkingConfig;
use super::DEVICE_PREFIX;

/// Role of a virtual network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Hostonly,
    Nat,
    Bridged,
}

impl Display for NetworkType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NetworkType::Hostonly => "hostonly",
            NetworkType::Nat => "nat",
            NetworkType::Bridged => "bridged",
        })
    }
}

impl FromStr for NetworkType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hostonly" => Ok(NetworkType::Hostonly),
            "nat" => Ok(NetworkType::Nat),
            "bridged" => Ok(NetworkType::Bridged),
            _ => Err(()),
        }
    }
}

/// Conventional roles of vmnet0, vmnet1 and vmnet8.
const DEFAULT_TYPES: [(u32, NetworkType); 3] = [
    (0, NetworkType::Bridged),
    (1, NetworkType::Hostonly),
    (8, NetworkType::Nat),
];

impl NetworkingConfig {
    /// Role of every known network.
    ///
    /// Defaults are overridden by answer tables, which are overridden by
    /// bridge mappings.
    pub fn network_types(&self) -> BTreeMap<u32, NetworkType> {
        let mut types: BTreeMap<u32, NetworkType> = DEFAULT_TYPES.into_iter().collect();

        for (network, table) in &self.answers {
            let kind = if table.get("VIRTUAL_ADAPTER").is_some_and(|v| v == "yes") {
                if !table.contains_key("HOSTONLY_SUBNET") || !table.contains_key("HOSTONLY_NETMASK")
                {
                    warn!(
                        "interface {DEVICE_PREFIX}{network} is missing some expected keys (HOSTONLY_SUBNET, HOSTONLY_NETMASK); ignoring"
                    );
                }
                if table.get("NAT").is_some_and(|v| v == "yes") {
                    NetworkType::Nat
                } else {
                    NetworkType::Hostonly
                }
            } else {
                NetworkType::Bridged
            };
            types.insert(*network, kind);
        }

        for network in self.bridge_mappings.values() {
            types.insert(*network, NetworkType::Bridged);
        }
        types
    }

    /// Networks grouped by role, each list in ascending order.
    pub fn networks_by_type(&self) -> BTreeMap<NetworkType, Vec<u32>> {
        let mut grouped: BTreeMap<NetworkType, Vec<u32>> = BTreeMap::new();
        for (network, kind) in self.network_types() {
            grouped.entry(kind).or_default().push(network);
        }
        grouped
    }
}

impl NetworkNameMapper for NetworkingConfig {
    fn name_into_devices(&self, name: &str) -> Result<Vec<String>, LookupError> {
        let unknown = || LookupError::UnknownName(name.to_string());
        let kind: NetworkType = name.parse().map_err(|_| unknown())?;
        let grouped = self.networks_by_type();
        let networks = grouped.get(&kind).filter(|list| !list.is_empty()).ok_or_else(unknown)?;
        Ok(networks
            .iter()
            .map(|network| format!("{DEVICE_PREFIX}{network}"))
            .collect())
    }

    fn device_into_name(&self, device: &str) -> Result<String, LookupError> {
        let lower = device.to_ascii_lowercase();
        let Some(number) = lower.strip_prefix(DEVICE_PREFIX) else {
            return Ok(device.to_string());
        };
        let network: u32 = number
            .parse()
            .map_err(|_| LookupError::InvalidDevice(device.to_string()))?;
        self.network_types()
            .get(&network)
            .map(ToString::to_string)
            .ok_or_else(|| LookupError::UnclassifiedDevice(device.to_string()))
    }
}
