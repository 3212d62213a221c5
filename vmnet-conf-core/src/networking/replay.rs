use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;

use network_interface::{NetworkInterface, NetworkInterfaceConfig};
use serde::Serialize;
use tracing::{debug, warn};

use super::command::{Command, RejectedRow};
use super::DEVICE_PREFIX;

/// Answers whether an interface name exists on the current host.
pub trait InterfaceLookup {
    fn exists(&self, name: &str) -> bool;
}

/// Checks names against the interfaces of the running host.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostInterfaces;

impl InterfaceLookup for HostInterfaces {
    fn exists(&self, name: &str) -> bool {
        match NetworkInterface::show() {
            Ok(interfaces) => interfaces.iter().any(|iface| iface.name == name),
            Err(err) => {
                debug!(error = %err, "unable to enumerate host interfaces");
                false
            }
        }
    }
}

/// State rebuilt by replaying a networking log.
///
/// Only [`replay`] builds one; nothing mutates it afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkingConfig {
    pub(super) answers: BTreeMap<u32, BTreeMap<String, String>>,
    pub(super) nat_port_forwards: BTreeMap<u32, BTreeMap<String, String>>,
    pub(super) dhcp_mac_to_ip: BTreeMap<u32, BTreeMap<String, IpAddr>>,
    pub(super) bridge_mappings: BTreeMap<String, u32>,
    pub(super) nat_prefixes: BTreeMap<u32, Vec<u8>>,
    pub(super) warnings: Vec<String>,
    pub(super) rejected: Vec<RejectedRow>,
}

impl NetworkingConfig {
    /// `VNET_<n>_<KEY>` answers, keyed by `n` then `KEY`.
    pub fn answers(&self) -> &BTreeMap<u32, BTreeMap<String, String>> {
        &self.answers
    }

    /// Port forwards per network, keyed by `"<protocol>/<port>"`.
    pub fn nat_port_forwards(&self) -> &BTreeMap<u32, BTreeMap<String, String>> {
        &self.nat_port_forwards
    }

    /// Reserved DHCP addresses per network, keyed by MAC text.
    pub fn dhcp_mac_to_ip(&self) -> &BTreeMap<u32, BTreeMap<String, IpAddr>> {
        &self.dhcp_mac_to_ip
    }

    /// Host interface to bridged network.
    pub fn bridge_mappings(&self) -> &BTreeMap<String, u32> {
        &self.bridge_mappings
    }

    pub fn nat_prefixes(&self) -> &BTreeMap<u32, Vec<u8>> {
        &self.nat_prefixes
    }

    /// Non-fatal anomalies noticed while replaying.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Rows that could not be interpreted and were skipped.
    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }

    fn apply(&mut self, command: Command, interfaces: &dyn InterfaceLookup) {
        match command {
            Command::Answer { key, value } => {
                self.answers
                    .entry(key.network)
                    .or_default()
                    .insert(key.option, value);
            }
            Command::RemoveAnswer { key } => {
                let removed = self
                    .answers
                    .get_mut(&key.network)
                    .and_then(|table| table.remove(&key.option));
                if removed.is_none() {
                    self.warn(format!(
                        "unable to remove answer {key} as specified by `remove_answer`"
                    ));
                }
            }
            Command::AddNatPortfwd {
                network,
                protocol,
                port,
                target_host,
                target_port,
            } => {
                self.nat_port_forwards
                    .entry(network)
                    .or_default()
                    .insert(format!("{protocol}/{port}"), format!("{target_host}:{target_port}"));
            }
            Command::RemoveNatPortfwd {
                network,
                protocol,
                port,
            } => {
                let key = format!("{protocol}/{port}");
                let removed = self
                    .nat_port_forwards
                    .get_mut(&network)
                    .and_then(|table| table.remove(&key));
                if removed.is_none() {
                    self.warn(format!(
                        "unable to remove nat port-forward {key} from interface {DEVICE_PREFIX}{network} as requested by `remove_nat_portfwd`"
                    ));
                }
            }
            Command::AddDhcpMacToIp { network, mac, ip } => {
                self.dhcp_mac_to_ip
                    .entry(network)
                    .or_default()
                    .insert(mac.to_string(), ip);
            }
            Command::RemoveDhcpMacToIp { network, mac } => {
                let removed = self
                    .dhcp_mac_to_ip
                    .get_mut(&network)
                    .and_then(|table| table.remove(&mac.to_string()));
                if removed.is_none() {
                    self.warn(format!(
                        "unable to remove dhcp_mac_to_ip entry {mac} from interface {DEVICE_PREFIX}{network} as specified by `remove_dhcp_mac_to_ip`"
                    ));
                }
            }
            Command::AddBridgeMapping { interface, network } => {
                if !interfaces.exists(&interface) {
                    self.warn(format!(
                        "interface \"{interface}\" as specified by `add_bridge_mapping` was not found on the current platform"
                    ));
                }
                self.bridge_mappings.insert(interface, network);
            }
            Command::RemoveBridgeMapping { interface } => {
                if !interfaces.exists(&interface) {
                    self.warn(format!(
                        "interface \"{interface}\" as specified by `remove_bridge_mapping` was not found on the current platform"
                    ));
                }
                if self.bridge_mappings.remove(&interface).is_none() {
                    self.warn(format!(
                        "unable to remove bridge mapping for \"{interface}\" as specified by `remove_bridge_mapping`"
                    ));
                }
            }
            Command::AddNatPrefix { network, prefix } => {
                self.nat_prefixes.entry(network).or_default().push(prefix);
            }
            Command::RemoveNatPrefix { network, prefix } => {
                let removed = self.nat_prefixes.get_mut(&network).and_then(|list| {
                    let index = list.iter().position(|p| *p == prefix)?;
                    Some(list.remove(index))
                });
                if removed.is_none() {
                    self.warn(format!(
                        "unable to remove nat prefix /{prefix} from interface {DEVICE_PREFIX}{network} as specified by `remove_nat_prefix`"
                    ));
                }
            }
        }
    }
}

/// Apply `commands` in order to an empty [`NetworkingConfig`].
///
/// Rejected rows are logged and kept; replay always runs to the end.
pub fn replay<I>(commands: I, interfaces: &dyn InterfaceLookup) -> NetworkingConfig
where
    I: IntoIterator<Item = Result<Command, RejectedRow>>,
{
    let mut config = NetworkingConfig::default();
    for item in commands {
        match item {
            Ok(command) => {
                debug!(%command, "replaying");
                config.apply(command, interfaces);
            }
            Err(rejected) => {
                warn!("{rejected}");
                config.rejected.push(rejected);
            }
        }
    }
    config
}

impl Display for NetworkingConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "answer -> {:?}", self.answers)?;
        writeln!(f, "nat_portfwd -> {:?}", self.nat_port_forwards)?;
        writeln!(f, "dhcp_mac_to_ip -> {:?}", self.dhcp_mac_to_ip)?;
        writeln!(f, "bridge_mapping -> {:?}", self.bridge_mappings)?;
        write!(f, "nat_prefix -> {:?}", self.nat_prefixes)
    }
}
