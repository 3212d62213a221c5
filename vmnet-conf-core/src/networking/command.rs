use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::Serialize;
use thiserror::Error;

use crate::hwaddr::MacAddr;
use crate::token::Token;

/// Why a single row of the networking log was not turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum CommandError {
    #[error("invalid command: {0}")]
    UnknownVerb(String),
    #[error("expected {expected} argument(s) but received {found}")]
    Arity { expected: usize, found: usize },
    #[error("invalid format for VNET: {0}")]
    InvalidVnet(String),
    #[error("unable to parse network index: {0}")]
    InvalidIndex(String),
    #[error("expected \"tcp\" or \"udp\": {0}")]
    InvalidProtocol(String),
    #[error("unable to parse port: {0}")]
    InvalidPort(String),
    #[error("unable to parse IP address: {0}")]
    InvalidAddress(String),
    #[error("unable to parse hardware address: {0}")]
    InvalidMac(String),
    #[error("expected a prefix of the form /<bits>: {0}")]
    InvalidPrefix(String),
}

/// A row that was skipped during replay, and why.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("unable to parse command {}: {error}", .row.join(" "))]
pub struct RejectedRow {
    pub row: Vec<String>,
    pub error: CommandError,
}

/// A `VNET_<n>_<KEY>` answer key. `n` is kept as written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VnetKey {
    pub network: u32,
    pub option: String,
}

impl FromStr for VnetKey {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CommandError::InvalidVnet(s.to_string());
        if s.to_ascii_uppercase() != s {
            return Err(invalid());
        }
        let mut parts = s.splitn(3, '_');
        let (Some("VNET"), Some(number), Some(option)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let network = number.parse().map_err(|_| invalid())?;
        Ok(Self {
            network,
            option: option.to_string(),
        })
    }
}

impl Display for VnetKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "VNET_{}_{}", self.network, self.option)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl FromStr for Protocol {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            _ => Err(CommandError::InvalidProtocol(s.to_string())),
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        })
    }
}

/// One mutation recorded in the networking log.
///
/// Bare network indices are zero-based; the log writes them one-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verb", rename_all = "snake_case")]
pub enum Command {
    Answer {
        key: VnetKey,
        value: String,
    },
    RemoveAnswer {
        key: VnetKey,
    },
    AddNatPortfwd {
        network: u32,
        protocol: Protocol,
        port: u16,
        target_host: IpAddr,
        target_port: u16,
    },
    RemoveNatPortfwd {
        network: u32,
        protocol: Protocol,
        port: u16,
    },
    AddDhcpMacToIp {
        network: u32,
        mac: MacAddr,
        ip: IpAddr,
    },
    RemoveDhcpMacToIp {
        network: u32,
        mac: MacAddr,
    },
    AddBridgeMapping {
        interface: String,
        network: u32,
    },
    RemoveBridgeMapping {
        interface: String,
    },
    AddNatPrefix {
        network: u32,
        prefix: u8,
    },
    RemoveNatPrefix {
        network: u32,
        prefix: u8,
    },
}

type CommandParser = fn(&[String]) -> Result<Command, CommandError>;

static COMMAND_PARSERS: LazyLock<HashMap<&'static str, CommandParser>> = LazyLock::new(|| {
    let parsers: [(&'static str, CommandParser); 10] = [
        ("answer", parse_answer),
        ("remove_answer", parse_remove_answer),
        ("add_nat_portfwd", parse_add_nat_portfwd),
        ("remove_nat_portfwd", parse_remove_nat_portfwd),
        ("add_dhcp_mac_to_ip", parse_add_dhcp_mac_to_ip),
        ("remove_dhcp_mac_to_ip", parse_remove_dhcp_mac_to_ip),
        ("add_bridge_mapping", parse_add_bridge_mapping),
        ("remove_bridge_mapping", parse_remove_bridge_mapping),
        ("add_nat_prefix", parse_add_nat_prefix),
        ("remove_nat_prefix", parse_remove_nat_prefix),
    ];
    parsers.into_iter().collect()
});

impl Command {
    /// Parse one row: the verb followed by its arguments.
    pub fn parse(row: &[String]) -> Result<Self, CommandError> {
        let Some((verb, args)) = row.split_first() else {
            return Err(CommandError::UnknownVerb(String::new()));
        };
        let parser = COMMAND_PARSERS
            .get(verb.as_str())
            .ok_or_else(|| CommandError::UnknownVerb(verb.clone()))?;
        parser(args)
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Command::Answer { .. } => "answer",
            Command::RemoveAnswer { .. } => "remove_answer",
            Command::AddNatPortfwd { .. } => "add_nat_portfwd",
            Command::RemoveNatPortfwd { .. } => "remove_nat_portfwd",
            Command::AddDhcpMacToIp { .. } => "add_dhcp_mac_to_ip",
            Command::RemoveDhcpMacToIp { .. } => "remove_dhcp_mac_to_ip",
            Command::AddBridgeMapping { .. } => "add_bridge_mapping",
            Command::RemoveBridgeMapping { .. } => "remove_bridge_mapping",
            Command::AddNatPrefix { .. } => "add_nat_prefix",
            Command::RemoveNatPrefix { .. } => "remove_nat_prefix",
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> ", self.verb())?;
        match self {
            Command::Answer { key, value } => write!(f, "{key} = {value}"),
            Command::RemoveAnswer { key } => write!(f, "{key}"),
            Command::AddNatPortfwd {
                network,
                protocol,
                port,
                target_host,
                target_port,
            } => write!(
                f,
                "vmnet{network} {protocol}/{port} => {target_host}:{target_port}"
            ),
            Command::RemoveNatPortfwd {
                network,
                protocol,
                port,
            } => write!(f, "vmnet{network} {protocol}/{port}"),
            Command::AddDhcpMacToIp { network, mac, ip } => {
                write!(f, "vmnet{network} {mac} => {ip}")
            }
            Command::RemoveDhcpMacToIp { network, mac } => write!(f, "vmnet{network} {mac}"),
            Command::AddBridgeMapping { interface, network } => {
                write!(f, "{interface} => vmnet{network}")
            }
            Command::RemoveBridgeMapping { interface } => write!(f, "{interface}"),
            Command::AddNatPrefix { network, prefix }
            | Command::RemoveNatPrefix { network, prefix } => {
                write!(f, "vmnet{network} /{prefix}")
            }
        }
    }
}

fn expect_args(args: &[String], expected: usize) -> Result<(), CommandError> {
    if args.len() != expected {
        return Err(CommandError::Arity {
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

/// One-based log index to zero-based network index.
fn network_index(text: &str) -> Result<u32, CommandError> {
    text.parse::<u32>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .ok_or_else(|| CommandError::InvalidIndex(text.to_string()))
}

fn port(text: &str) -> Result<u16, CommandError> {
    text.parse()
        .map_err(|_| CommandError::InvalidPort(text.to_string()))
}

fn address(text: &str) -> Result<IpAddr, CommandError> {
    text.parse()
        .map_err(|_| CommandError::InvalidAddress(text.to_string()))
}

fn mac(text: &str) -> Result<MacAddr, CommandError> {
    text.parse()
        .map_err(|_| CommandError::InvalidMac(text.to_string()))
}

/// `/<bits>` with at most 128 bits.
fn prefix(text: &str) -> Result<u8, CommandError> {
    text.strip_prefix('/')
        .and_then(|bits| bits.parse::<u8>().ok())
        .filter(|bits| *bits <= 128)
        .ok_or_else(|| CommandError::InvalidPrefix(text.to_string()))
}

fn parse_answer(args: &[String]) -> Result<Command, CommandError> {
    expect_args(args, 2)?;
    Ok(Command::Answer {
        key: args[0].parse()?,
        value: args[1].clone(),
    })
}

fn parse_remove_answer(args: &[String]) -> Result<Command, CommandError> {
    expect_args(args, 1)?;
    Ok(Command::RemoveAnswer {
        key: args[0].parse()?,
    })
}

fn parse_add_nat_portfwd(args: &[String]) -> Result<Command, CommandError> {
    expect_args(args, 5)?;
    Ok(Command::AddNatPortfwd {
        network: network_index(&args[0])?,
        protocol: args[1].parse()?,
        port: port(&args[2])?,
        target_host: address(&args[3])?,
        target_port: port(&args[4])?,
    })
}

fn parse_remove_nat_portfwd(args: &[String]) -> Result<Command, CommandError> {
    expect_args(args, 3)?;
    Ok(Command::RemoveNatPortfwd {
        network: network_index(&args[0])?,
        protocol: args[1].parse()?,
        port: port(&args[2])?,
    })
}

fn parse_add_dhcp_mac_to_ip(args: &[String]) -> Result<Command, CommandError> {
    expect_args(args, 3)?;
    Ok(Command::AddDhcpMacToIp {
        network: network_index(&args[0])?,
        mac: mac(&args[1])?,
        ip: address(&args[2])?,
    })
}

fn parse_remove_dhcp_mac_to_ip(args: &[String]) -> Result<Command, CommandError> {
    expect_args(args, 2)?;
    Ok(Command::RemoveDhcpMacToIp {
        network: network_index(&args[0])?,
        mac: mac(&args[1])?,
    })
}

fn parse_add_bridge_mapping(args: &[String]) -> Result<Command, CommandError> {
    expect_args(args, 2)?;
    Ok(Command::AddBridgeMapping {
        interface: args[0].clone(),
        network: network_index(&args[1])?,
    })
}

fn parse_remove_bridge_mapping(args: &[String]) -> Result<Command, CommandError> {
    expect_args(args, 1)?;
    Ok(Command::RemoveBridgeMapping {
        interface: args[0].clone(),
    })
}

fn parse_add_nat_prefix(args: &[String]) -> Result<Command, CommandError> {
    expect_args(args, 2)?;
    Ok(Command::AddNatPrefix {
        network: network_index(&args[0])?,
        prefix: prefix(&args[1])?,
    })
}

fn parse_remove_nat_prefix(args: &[String]) -> Result<Command, CommandError> {
    expect_args(args, 2)?;
    Ok(Command::RemoveNatPrefix {
        network: network_index(&args[0])?,
        prefix: prefix(&args[1])?,
    })
}

/// Group a networking token stream into rows, dropping empty ones.
pub fn split_rows<I>(tokens: I) -> Rows<I::IntoIter>
where
    I: IntoIterator<Item = Token>,
{
    Rows {
        tokens: tokens.into_iter(),
    }
}

/// Iterator returned by [`split_rows`].
#[derive(Debug)]
pub struct Rows<I> {
    tokens: I,
}

impl<I> Iterator for Rows<I>
where
    I: Iterator<Item = Token>,
{
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Vec<String>> {
        let mut row = Vec::new();
        for token in self.tokens.by_ref() {
            match token {
                Token::Newline if row.is_empty() => continue,
                Token::Newline => return Some(row),
                other => row.push(other.into_text()),
            }
        }
        (!row.is_empty()).then_some(row)
    }
}

/// Interpret every row, keeping failures alongside the row that caused them.
pub fn parse_commands<I>(rows: I) -> impl Iterator<Item = Result<Command, RejectedRow>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    rows.into_iter().map(|row| match Command::parse(&row) {
        Ok(command) => Ok(command),
        Err(error) => Err(RejectedRow { row, error }),
    })
}
