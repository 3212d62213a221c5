use std::fmt::{self, Display, Formatter};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnet::Ipv6Net;
use serde::Serialize;

use crate::hwaddr::MacAddr;

use super::tree::Statement;
use super::DhcpConfigError;

/// Access verb of an `allow`/`deny`/`ignore` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grant {
    Allow,
    Ignore,
    Deny,
}

impl FromStr for Grant {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(Grant::Allow),
            "ignore" => Ok(Grant::Ignore),
            "deny" => Ok(Grant::Deny),
            _ => Err(()),
        }
    }
}

impl Display for Grant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Grant::Allow => "allow",
            Grant::Ignore => "ignore",
            Grant::Deny => "deny",
        })
    }
}

/// `host-identifier option <name> <data>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientMatch {
    pub name: String,
    pub data: String,
}

/// A typed DHCP-config parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Parameter {
    Include { filename: String },
    Option { name: String, value: String },
    Grant { grant: Grant, attribute: String },
    Address4 { addresses: Vec<String> },
    Address6 { addresses: Vec<String> },
    Hardware { class: String, address: MacAddr },
    Boolean { name: String, value: bool },
    ClientMatch(ClientMatch),
    Range4 { min: Ipv4Addr, max: Ipv4Addr },
    Range6 { min: Ipv6Addr, max: Ipv6Addr },
    Prefix6 { min: Ipv6Addr, max: Ipv6Addr, bits: u8 },
    Other { name: String, value: String },
    Expression { name: String, expression: String },
}

impl Parameter {
    /// Interpret a generic statement by its keyword.
    pub fn interpret(statement: &Statement) -> Result<Self, DhcpConfigError> {
        let ops = statement.operands.as_slice();
        let fail = |reason: &str| DhcpConfigError::Parameter {
            keyword: statement.name.clone(),
            operands: statement.operands.clone(),
            reason: reason.to_string(),
        };

        if let Ok(grant) = statement.name.parse::<Grant>() {
            if ops.is_empty() {
                return Err(fail("expected at least 1 operand"));
            }
            return Ok(Parameter::Grant {
                grant,
                attribute: ops.join(" "),
            });
        }

        match statement.name.as_str() {
            "include" => match ops {
                [filename] => Ok(Parameter::Include {
                    filename: filename.clone(),
                }),
                _ => Err(fail("expected exactly 1 operand")),
            },
            "option" => match ops {
                [name, value] => Ok(Parameter::Option {
                    name: name.clone(),
                    value: value.clone(),
                }),
                _ => Err(fail("expected exactly 2 operands")),
            },
            "range" => {
                let skip = usize::from(
                    ops.first()
                        .is_some_and(|first| first.eq_ignore_ascii_case("bootp")),
                );
                match &ops[skip..] {
                    [only] => {
                        let addr = parse_ipv4(only).map_err(|reason| fail(&reason))?;
                        Ok(Parameter::Range4 {
                            min: addr,
                            max: addr,
                        })
                    }
                    [low, high] => Ok(Parameter::Range4 {
                        min: parse_ipv4(low).map_err(|reason| fail(&reason))?,
                        max: parse_ipv4(high).map_err(|reason| fail(&reason))?,
                    }),
                    _ => Err(fail("expected [bootp] <low> [<high>]")),
                }
            }
            "range6" => match ops {
                [single] if single.contains('/') => {
                    let net = single
                        .parse::<Ipv6Net>()
                        .map_err(|_| fail("unknown ipv6 prefix format"))?;
                    Ok(Parameter::Range6 {
                        min: net.network(),
                        max: net.broadcast(),
                    })
                }
                [single] => {
                    let addr = parse_ipv6(single).map_err(|reason| fail(&reason))?;
                    Ok(Parameter::Range6 {
                        min: addr,
                        max: addr,
                    })
                }
                [addr, marker] if marker.eq_ignore_ascii_case("temporary") => {
                    let addr = parse_ipv6(addr).map_err(|reason| fail(&reason))?;
                    Ok(Parameter::Range6 {
                        min: addr,
                        max: addr,
                    })
                }
                [low, high] => Ok(Parameter::Range6 {
                    min: parse_ipv6(low).map_err(|reason| fail(&reason))?,
                    max: parse_ipv6(high).map_err(|reason| fail(&reason))?,
                }),
                _ => Err(fail("expected <address>, <prefix>, <address> temporary or <low> <high>")),
            },
            "prefix6" => match ops {
                [low, high, bits] => {
                    let bits = bits
                        .trim_start_matches('/')
                        .parse::<u8>()
                        .ok()
                        .filter(|bits| *bits <= 128)
                        .ok_or_else(|| fail("invalid prefix length"))?;
                    Ok(Parameter::Prefix6 {
                        min: parse_ipv6(low).map_err(|reason| fail(&reason))?,
                        max: parse_ipv6(high).map_err(|reason| fail(&reason))?,
                        bits,
                    })
                }
                _ => Err(fail("expected exactly 3 operands")),
            },
            "hardware" => match ops {
                [class, address] => {
                    let address = address
                        .parse::<MacAddr>()
                        .map_err(|err| fail(&err.to_string()))?;
                    Ok(Parameter::Hardware {
                        class: class.clone(),
                        address,
                    })
                }
                _ => Err(fail("expected exactly 2 operands")),
            },
            "fixed-address" => Ok(Parameter::Address4 {
                addresses: split_address_list(ops),
            }),
            "fixed-address6" => Ok(Parameter::Address6 {
                addresses: split_address_list(ops),
            }),
            "host-identifier" => match ops {
                [kind, name, data] if kind == "option" => {
                    Ok(Parameter::ClientMatch(ClientMatch {
                        name: name.clone(),
                        data: data.clone(),
                    }))
                }
                [_, _, _] => Err(fail("expected `option` as match kind")),
                _ => Err(fail("expected exactly 3 operands")),
            },
            _ => interpret_generic(statement, fail),
        }
    }
}

fn interpret_generic(
    statement: &Statement,
    fail: impl Fn(&str) -> DhcpConfigError,
) -> Result<Parameter, DhcpConfigError> {
    let name = statement.name.clone();
    match statement.operands.as_slice() {
        [] => Ok(Parameter::Boolean { name, value: true }),
        [first, rest @ ..] if first == "=" && !rest.is_empty() => Ok(Parameter::Expression {
            name,
            expression: rest.join(" "),
        }),
        [flag] if name.eq_ignore_ascii_case("not") => Ok(Parameter::Boolean {
            name: flag.clone(),
            value: false,
        }),
        [value] => Ok(Parameter::Other {
            name,
            value: value.clone(),
        }),
        _ => Err(fail("expected exactly 1 operand")),
    }
}

fn parse_ipv4(text: &str) -> Result<Ipv4Addr, String> {
    text.parse()
        .map_err(|_| format!("invalid IPv4 address {text:?}"))
}

fn parse_ipv6(text: &str) -> Result<Ipv6Addr, String> {
    text.parse()
        .map_err(|_| format!("invalid IPv6 address {text:?}"))
}

/// `fixed-address a, b` arrives as `["a,", "b"]`.
fn split_address_list(operands: &[String]) -> Vec<String> {
    operands
        .iter()
        .flat_map(|op| op.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Include { filename } => write!(f, "include-file:filename={filename}"),
            Parameter::Option { name, value } => write!(f, "option:{name}={value}"),
            Parameter::Grant { grant, attribute } => write!(f, "grant:{grant},{attribute}"),
            Parameter::Address4 { addresses } => {
                write!(f, "fixed-address4:{}", addresses.join(","))
            }
            Parameter::Address6 { addresses } => {
                write!(f, "fixed-address6:{}", addresses.join(","))
            }
            Parameter::Hardware { class, address } => {
                write!(f, "hardware-address:{class}[{address}]")
            }
            Parameter::Boolean { name, value } => write!(f, "boolean:{name}={value}"),
            Parameter::ClientMatch(m) => write!(f, "match-client:{}={}", m.name, m.data),
            Parameter::Range4 { min, max } => write!(f, "range4:{min}-{max}"),
            Parameter::Range6 { min, max } => write!(f, "range6:{min}-{max}"),
            Parameter::Prefix6 { min, max, bits } => write!(f, "prefix6:/{bits}:{min}-{max}"),
            Parameter::Other { name, value } => write!(f, "parameter:{name}={value}"),
            Parameter::Expression { name, expression } => {
                write!(f, "parameter-expression:{name}=\"{expression}\"")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(line: &str) -> Statement {
        let mut words = line.split_whitespace().map(str::to_string);
        Statement {
            name: words.next().unwrap_or_default(),
            operands: words.collect(),
        }
    }

    fn interpret(line: &str) -> Result<Parameter, DhcpConfigError> {
        Parameter::interpret(&stmt(line))
    }

    #[test]
    fn option_requires_two_operands() {
        assert_eq!(
            interpret("option routers 10.0.0.1").expect("option"),
            Parameter::Option {
                name: "routers".to_string(),
                value: "10.0.0.1".to_string()
            }
        );
        let err = interpret("option routers").expect_err("arity");
        let text = err.to_string();
        assert!(text.contains("option"));
        assert!(text.contains("routers"));
    }

    #[test]
    fn grant_verbs_are_case_folded() {
        assert_eq!(
            interpret("DENY unknown-clients").expect("grant"),
            Parameter::Grant {
                grant: Grant::Deny,
                attribute: "unknown-clients".to_string()
            }
        );
        assert!(interpret("allow").is_err());
    }

    #[test]
    fn range_accepts_bootp_marker_and_single_address() {
        assert_eq!(
            interpret("range bootp 10.0.0.5").expect("range"),
            Parameter::Range4 {
                min: Ipv4Addr::new(10, 0, 0, 5),
                max: Ipv4Addr::new(10, 0, 0, 5)
            }
        );
        assert_eq!(
            interpret("range 10.0.0.5 10.0.0.9").expect("range"),
            Parameter::Range4 {
                min: Ipv4Addr::new(10, 0, 0, 5),
                max: Ipv4Addr::new(10, 0, 0, 9)
            }
        );
        assert!(interpret("range bootp").is_err());
        assert!(interpret("range 10.0.0.1 10.0.0.2 10.0.0.3").is_err());
        assert!(interpret("range not-an-ip").is_err());
    }

    #[test]
    fn range6_cidr_yields_network_and_broadcast() {
        let Parameter::Range6 { min, max } = interpret("range6 2001:db8::1234/64").expect("range6")
        else {
            panic!("expected range6");
        };
        let mask = u128::MAX << 64;
        assert_eq!(u128::from(min) & mask, u128::from(min));
        assert_eq!(u128::from(max) | !mask, u128::from(max));
        assert_eq!(min, "2001:db8::".parse::<Ipv6Addr>().expect("addr"));
        assert_eq!(
            max,
            "2001:db8::ffff:ffff:ffff:ffff".parse::<Ipv6Addr>().expect("addr")
        );
    }

    #[test]
    fn range6_temporary_is_single_address() {
        let addr: Ipv6Addr = "2001:db8::10".parse().expect("addr");
        assert_eq!(
            interpret("range6 2001:db8::10 temporary").expect("range6"),
            Parameter::Range6 {
                min: addr,
                max: addr
            }
        );
    }

    #[test]
    fn prefix6_accepts_slash_bits() {
        assert_eq!(
            interpret("prefix6 2001:db8:0:100:: 2001:db8:0:f00:: /56").expect("prefix6"),
            Parameter::Prefix6 {
                min: "2001:db8:0:100::".parse().expect("addr"),
                max: "2001:db8:0:f00::".parse().expect("addr"),
                bits: 56
            }
        );
    }

    #[test]
    fn hardware_requires_six_octets() {
        assert!(matches!(
            interpret("hardware ethernet 00:50:56:c0:00:01").expect("hardware"),
            Parameter::Hardware { .. }
        ));
        assert!(interpret("hardware ethernet 00:50:56").is_err());
    }

    #[test]
    fn fixed_address_splits_commas() {
        assert_eq!(
            interpret("fixed-address 10.0.0.2, vm.local").expect("fixed-address"),
            Parameter::Address4 {
                addresses: vec!["10.0.0.2".to_string(), "vm.local".to_string()]
            }
        );
    }

    #[test]
    fn generic_keywords() {
        assert_eq!(
            interpret("authoritative").expect("bool"),
            Parameter::Boolean {
                name: "authoritative".to_string(),
                value: true
            }
        );
        assert_eq!(
            interpret("not authoritative").expect("bool"),
            Parameter::Boolean {
                name: "authoritative".to_string(),
                value: false
            }
        );
        assert_eq!(
            interpret("ddns-hostname = pick(a, b)").expect("expression"),
            Parameter::Expression {
                name: "ddns-hostname".to_string(),
                expression: "pick(a, b)".to_string()
            }
        );
        assert_eq!(
            interpret("default-lease-time 1800").expect("other"),
            Parameter::Other {
                name: "default-lease-time".to_string(),
                value: "1800".to_string()
            }
        );
        assert!(interpret("max-lease-time 1 2").is_err());
    }

    #[test]
    fn host_identifier_requires_option_kind() {
        assert!(matches!(
            interpret("host-identifier option dhcp6.client-id 00:01").expect("match"),
            Parameter::ClientMatch(_)
        ));
        assert!(interpret("host-identifier foo a b").is_err());
    }
}
