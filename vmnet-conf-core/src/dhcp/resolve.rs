use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};

use serde::Serialize;

use crate::hwaddr::MacAddr;

use super::declaration::{DeclarationId, DeclarationTree};
use super::param::{ClientMatch, Grant, Parameter};
use super::DhcpConfigError;

/// A declaration with every ancestor's parameters folded in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigDeclaration {
    /// Identities from the global scope down to this declaration.
    pub path: Vec<DeclarationId>,
    /// Address-like parameters (fixed addresses, hardware, ranges, includes), accumulated.
    pub address: Vec<Parameter>,
    pub options: BTreeMap<String, String>,
    pub grants: BTreeMap<String, Grant>,
    pub attributes: BTreeMap<String, bool>,
    pub parameters: BTreeMap<String, String>,
    pub expressions: BTreeMap<String, String>,
    /// Host-identifier matches, accumulated.
    pub hostid: Vec<ClientMatch>,
}

impl ConfigDeclaration {
    fn resolve(tree: &DeclarationTree, index: usize) -> Self {
        let mut chain = tree.ancestry(index);
        chain.reverse();

        let mut out = ConfigDeclaration::default();
        for node in chain.iter().filter_map(|i| tree.get(*i)) {
            out.path.push(node.id.clone());
            for parameter in &node.parameters {
                out.apply(parameter);
            }
        }
        out
    }

    fn apply(&mut self, parameter: &Parameter) {
        match parameter {
            Parameter::Option { name, value } => {
                self.options.insert(name.clone(), value.clone());
            }
            Parameter::Grant { grant, attribute } => {
                self.grants.insert(attribute.clone(), *grant);
            }
            Parameter::Boolean { name, value } => {
                self.attributes.insert(name.clone(), *value);
            }
            Parameter::ClientMatch(matcher) => self.hostid.push(matcher.clone()),
            Parameter::Expression { name, expression } => {
                self.expressions.insert(name.clone(), expression.clone());
            }
            Parameter::Other { name, value } => {
                self.parameters.insert(name.clone(), value.clone());
            }
            Parameter::Include { .. }
            | Parameter::Address4 { .. }
            | Parameter::Address6 { .. }
            | Parameter::Hardware { .. }
            | Parameter::Range4 { .. }
            | Parameter::Range6 { .. }
            | Parameter::Prefix6 { .. } => self.address.push(parameter.clone()),
        }
    }

    /// Identity of the declaration itself.
    pub fn id(&self) -> &DeclarationId {
        self.path.last().unwrap_or(&DeclarationId::Global)
    }

    /// The single IPv4 fixed address, resolving a host name if needed.
    pub fn ip4(&self) -> Result<Ipv4Addr, DhcpConfigError> {
        let candidate = self.single_address("IPv4", |p| match p {
            Parameter::Address4 { addresses } => Some(addresses),
            _ => None,
        })?;
        if let Ok(addr) = candidate.parse() {
            return Ok(addr);
        }
        resolve_host(candidate)?
            .into_iter()
            .find_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .ok_or(DhcpConfigError::MissingAddress("IPv4"))
    }

    /// The single IPv6 fixed address, resolving a host name if needed.
    pub fn ip6(&self) -> Result<Ipv6Addr, DhcpConfigError> {
        let candidate = self.single_address("IPv6", |p| match p {
            Parameter::Address6 { addresses } => Some(addresses),
            _ => None,
        })?;
        if let Ok(addr) = candidate.parse() {
            return Ok(addr);
        }
        resolve_host(candidate)?
            .into_iter()
            .find_map(|ip| match ip {
                IpAddr::V6(v6) => Some(v6),
                IpAddr::V4(_) => None,
            })
            .ok_or(DhcpConfigError::MissingAddress("IPv6"))
    }

    /// The single hardware address visible at this scope.
    pub fn hardware(&self) -> Result<MacAddr, DhcpConfigError> {
        let found: Vec<MacAddr> = self
            .address
            .iter()
            .filter_map(|p| match p {
                Parameter::Hardware { address, .. } => Some(*address),
                _ => None,
            })
            .collect();
        match found.as_slice() {
            [] => Err(DhcpConfigError::MissingAddress("hardware")),
            [only] => Ok(*only),
            many => Err(DhcpConfigError::MultipleAddresses {
                family: "hardware",
                found: many.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    fn single_address<'a>(
        &'a self,
        family: &'static str,
        select: impl Fn(&'a Parameter) -> Option<&'a Vec<String>>,
    ) -> Result<&'a str, DhcpConfigError> {
        let found: Vec<&String> = self.address.iter().filter_map(select).flatten().collect();
        match found.as_slice() {
            [] => Err(DhcpConfigError::MissingAddress(family)),
            [only] => Ok(only.as_str()),
            many => Err(DhcpConfigError::MultipleAddresses {
                family,
                found: many.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

fn resolve_host(host: &str) -> Result<Vec<IpAddr>, DhcpConfigError> {
    let addrs = (host, 0)
        .to_socket_addrs()
        .map_err(|source| DhcpConfigError::Resolve {
            host: host.to_string(),
            source,
        })?;
    Ok(addrs.map(|sock| sock.ip()).collect())
}

impl Display for ConfigDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.path.iter().map(ToString::to_string).collect();
        writeln!(f, "{}", ids.join(","))?;

        if !self.address.is_empty() {
            let items: Vec<String> = self.address.iter().map(ToString::to_string).collect();
            writeln!(f, "address : {}", items.join(","))?;
        }
        if !self.options.is_empty() {
            writeln!(f, "options : {:?}", self.options)?;
        }
        if !self.grants.is_empty() {
            writeln!(f, "grants : {:?}", self.grants)?;
        }
        if !self.attributes.is_empty() {
            writeln!(f, "attributes : {:?}", self.attributes)?;
        }
        if !self.parameters.is_empty() {
            writeln!(f, "parameters : {:?}", self.parameters)?;
        }
        if !self.expressions.is_empty() {
            writeln!(f, "parameter-expressions : {:?}", self.expressions)?;
        }
        if !self.hostid.is_empty() {
            let items: Vec<String> = self
                .hostid
                .iter()
                .map(|m| format!("match-client:{}={}", m.name, m.data))
                .collect();
            writeln!(f, "hostid : {}", items.join(" "))?;
        }
        Ok(())
    }
}

/// Every declaration of a DHCP configuration, resolved, in pre-order.
///
/// The first element is always the global declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DhcpConfiguration {
    declarations: Vec<ConfigDeclaration>,
}

impl DhcpConfiguration {
    /// Resolve every node of `tree`, root first.
    pub fn flatten(tree: &DeclarationTree) -> Self {
        let mut declarations: Vec<ConfigDeclaration> = tree
            .preorder()
            .into_iter()
            .map(|index| ConfigDeclaration::resolve(tree, index))
            .collect();
        if declarations.is_empty() {
            declarations.push(ConfigDeclaration {
                path: vec![DeclarationId::Global],
                ..ConfigDeclaration::default()
            });
        }
        Self { declarations }
    }

    pub fn declarations(&self) -> &[ConfigDeclaration] {
        &self.declarations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfigDeclaration> {
        self.declarations.iter()
    }

    pub fn global(&self) -> &ConfigDeclaration {
        &self.declarations[0]
    }

    /// The one subnet declaration containing `address`.
    pub fn subnet_by_address(&self, address: IpAddr) -> Result<&ConfigDeclaration, DhcpConfigError> {
        self.unique("network", address.to_string(), |decl| decl.id().contains(address))
    }

    /// The one host declaration named `host`, compared case-insensitively.
    pub fn host_by_name(&self, host: &str) -> Result<&ConfigDeclaration, DhcpConfigError> {
        self.unique("host", host.to_string(), |decl| {
            matches!(decl.id(), DeclarationId::Host(name) if name.eq_ignore_ascii_case(host))
        })
    }

    fn unique(
        &self,
        kind: &'static str,
        needle: String,
        predicate: impl Fn(&ConfigDeclaration) -> bool,
    ) -> Result<&ConfigDeclaration, DhcpConfigError> {
        let matches: Vec<&ConfigDeclaration> =
            self.declarations.iter().filter(|d| predicate(d)).collect();
        match matches.as_slice() {
            [] => Err(DhcpConfigError::NoMatch { kind, needle }),
            [only] => Ok(only),
            many => Err(DhcpConfigError::Ambiguous {
                kind,
                needle,
                found: many.iter().map(|d| d.id().to_string()).collect(),
            }),
        }
    }
}

impl<'a> IntoIterator for &'a DhcpConfiguration {
    type Item = &'a ConfigDeclaration;
    type IntoIter = std::slice::Iter<'a, ConfigDeclaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.declarations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dhcp::parse_dhcp_config;

    #[test]
    fn descendant_overrides_scalar_and_accumulates_lists() {
        let config = parse_dhcp_config(
            b"option domain-name \"outer\";\n\
              default-lease-time 600;\n\
              host-identifier option a 1;\n\
              group {\n\
                option domain-name \"inner\";\n\
                host-identifier option b 2;\n\
                host vm { fixed-address 10.0.0.9; }\n\
              }\n",
        )
        .expect("config");

        let host = config.host_by_name("VM").expect("host");
        assert_eq!(host.options["domain-name"], "\"inner\"");
        assert_eq!(host.parameters["default-lease-time"], "600");
        assert_eq!(host.hostid.len(), 2);
        assert_eq!(host.path.len(), 3);
        assert_eq!(host.ip4().expect("ip4"), Ipv4Addr::new(10, 0, 0, 9));

        assert_eq!(config.global().options["domain-name"], "\"outer\"");
        assert_eq!(config.global().hostid.len(), 1);
    }

    #[test]
    fn hardware_requires_exactly_one() {
        let config = parse_dhcp_config(
            b"host one { hardware ethernet 00:50:56:00:00:01; }\n\
              host two { hardware ethernet 00:50:56:00:00:02; hardware ethernet 00:50:56:00:00:03; }\n\
              host three { }",
        )
        .expect("config");
        assert_eq!(
            config
                .host_by_name("one")
                .and_then(|d| d.hardware())
                .expect("hardware")
                .to_string(),
            "00:50:56:00:00:01"
        );
        assert!(matches!(
            config.host_by_name("two").and_then(|d| d.hardware()),
            Err(DhcpConfigError::MultipleAddresses { .. })
        ));
        assert!(matches!(
            config.host_by_name("three").and_then(|d| d.hardware()),
            Err(DhcpConfigError::MissingAddress("hardware"))
        ));
    }

    #[test]
    fn display_lists_populated_sections() {
        let config = parse_dhcp_config(b"allow booting; option routers 10.0.0.1;").expect("config");
        let text = config.global().to_string();
        assert!(text.starts_with("{global}\n"));
        assert!(text.contains("options : {\"routers\": \"10.0.0.1\"}"));
        assert!(text.contains("grants : {\"booting\": Allow}"));
        assert!(!text.contains("address :"));
    }
}
