use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};

use ipnet::{Ipv4Net, Ipv6Net};
use serde::Serialize;

use super::param::Parameter;
use super::tree::{ScopeTree, Statement};
use super::DhcpConfigError;

/// Identity of a declaration scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum DeclarationId {
    Global,
    SharedNetwork(String),
    Subnet4(Ipv4Net),
    Subnet6(Ipv6Net),
    Host(String),
    Pool,
    Group,
}

impl DeclarationId {
    fn interpret(header: &Statement) -> Result<Self, DhcpConfigError> {
        let ops = header.operands.as_slice();
        let fail = |reason: &str| DhcpConfigError::Declaration {
            keyword: header.name.clone(),
            operands: header.operands.clone(),
            reason: reason.to_string(),
        };

        match header.name.as_str() {
            "group" => Ok(DeclarationId::Group),
            "pool" => Ok(DeclarationId::Pool),
            "host" => match ops {
                [name] => Ok(DeclarationId::Host(name.clone())),
                _ => Err(fail("expected exactly 1 operand")),
            },
            "shared-network" => match ops {
                [name] => Ok(DeclarationId::SharedNetwork(name.clone())),
                _ => Err(fail("expected exactly 1 operand")),
            },
            "subnet" => match ops {
                [addr, keyword, mask] if keyword.eq_ignore_ascii_case("netmask") => {
                    let addr: Ipv4Addr = addr
                        .parse()
                        .map_err(|_| fail("invalid subnet address"))?;
                    let prefix = netmask_prefix(mask).ok_or_else(|| fail("invalid netmask"))?;
                    let net = Ipv4Net::new(addr, prefix).map_err(|_| fail("invalid netmask"))?;
                    Ok(DeclarationId::Subnet4(net))
                }
                _ => Err(fail("expected <address> netmask <mask>")),
            },
            "subnet6" => match ops {
                [cidr] if cidr.contains('/') => cidr
                    .parse::<Ipv6Net>()
                    .map(DeclarationId::Subnet6)
                    .map_err(|_| fail("invalid ipv6 prefix")),
                _ => Err(fail("expected <address>/<prefix>")),
            },
            "" => Err(fail("declaration has no name")),
            _ => Err(fail("unknown declaration")),
        }
    }

    /// Whether this is a subnet declaration covering `address`.
    pub fn contains(&self, address: IpAddr) -> bool {
        match (self, address) {
            (DeclarationId::Subnet4(net), IpAddr::V4(addr)) => net.contains(&addr),
            (DeclarationId::Subnet6(net), IpAddr::V6(addr)) => net.contains(&addr),
            _ => false,
        }
    }
}

/// Dotted-quad netmask to prefix length; the one bits must be contiguous.
fn netmask_prefix(mask: &str) -> Option<u8> {
    let bits = u32::from(mask.parse::<Ipv4Addr>().ok()?);
    if bits.leading_ones() + bits.trailing_zeros() != 32 {
        return None;
    }
    u8::try_from(bits.leading_ones()).ok()
}

impl Display for DeclarationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationId::Global => f.write_str("{global}"),
            DeclarationId::SharedNetwork(name) => write!(f, "{{shared-network {name}}}"),
            DeclarationId::Subnet4(net) => write!(f, "{{subnet4 {net}}}"),
            DeclarationId::Subnet6(net) => write!(f, "{{subnet6 {net}}}"),
            DeclarationId::Host(name) => write!(f, "{{host name:{name}}}"),
            DeclarationId::Pool => f.write_str("{pool}"),
            DeclarationId::Group => f.write_str("{group}"),
        }
    }
}

/// An interpreted scope: its identity, its own parameters and its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub id: DeclarationId,
    /// Enclosing scope. Used for inheritance walks only.
    pub parent: Option<usize>,
    pub parameters: Vec<Parameter>,
    pub children: Vec<usize>,
}

/// Interpreted declarations sharing the arena layout of the [`ScopeTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationTree {
    nodes: Vec<Declaration>,
}

impl DeclarationTree {
    pub const ROOT: usize = ScopeTree::ROOT;

    /// Interpret every scope header and statement of `scopes`.
    ///
    /// Fails on the first header or statement that does not interpret.
    pub fn interpret(scopes: &ScopeTree) -> Result<Self, DhcpConfigError> {
        let mut nodes = Vec::with_capacity(scopes.scopes.len());
        for (index, scope) in scopes.scopes.iter().enumerate() {
            let id = if index == ScopeTree::ROOT {
                DeclarationId::Global
            } else {
                DeclarationId::interpret(&scope.header)?
            };
            let parameters = scope
                .statements
                .iter()
                .map(Parameter::interpret)
                .collect::<Result<Vec<_>, _>>()?;
            nodes.push(Declaration {
                id,
                parent: scope.parent,
                parameters,
                children: scope.children.clone(),
            });
        }
        Ok(Self { nodes })
    }

    pub fn get(&self, index: usize) -> Option<&Declaration> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `index` followed by its ancestors, closest first.
    pub fn ancestry(&self, index: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut cursor = Some(index);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.nodes.get(current).and_then(|node| node.parent);
        }
        chain
    }

    /// Node indices in pre-order, root first.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return order;
        }
        let mut stack = vec![Self::ROOT];
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.nodes[index].children.iter().rev());
        }
        order
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dhcp::tree::parse_scopes;
    use crate::token::{tokenize, DHCP_CONFIG};

    fn tree(input: &str) -> Result<DeclarationTree, DhcpConfigError> {
        let scopes = parse_scopes(tokenize(input.bytes(), &DHCP_CONFIG))?;
        DeclarationTree::interpret(&scopes)
    }

    #[test]
    fn interprets_subnet_with_netmask() {
        let tree = tree("subnet 172.16.1.0 netmask 255.255.255.0 { }").expect("tree");
        let subnet = tree.get(1).expect("subnet");
        assert_eq!(subnet.id.to_string(), "{subnet4 172.16.1.0/24}");
        assert!(subnet.id.contains("172.16.1.77".parse().expect("ip")));
        assert!(!subnet.id.contains("172.16.2.1".parse().expect("ip")));
    }

    #[test]
    fn rejects_malformed_declarations() {
        assert!(tree("subnet 10.0.0.0 { }").is_err());
        assert!(tree("subnet 10.0.0.0 netmask 255.0.255.0 { }").is_err());
        assert!(tree("subnet6 2001:db8:: { }").is_err());
        assert!(tree("host { }").is_err());
        assert!(tree("{ }").is_err());
        assert!(tree("widget x { }").is_err());
    }

    #[test]
    fn preorder_visits_root_then_children_in_order() {
        let tree = tree("group { host a { } } pool { }").expect("tree");
        assert_eq!(tree.preorder(), vec![0, 1, 2, 3]);
        assert_eq!(tree.ancestry(2), vec![2, 1, 0]);
    }
}
