//! `networking` log parsing: versioned command rows replayed into tables.

use std::fmt::{self, Display, Formatter};
use std::io::Read;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::filter::consume;
use crate::token::{tokenize, NETWORKING};

mod classify;
mod command;
mod replay;

pub use classify::NetworkType;
pub use command::{
    parse_commands, split_rows, Command, CommandError, Protocol, RejectedRow, Rows, VnetKey,
};
pub use replay::{replay, HostInterfaces, InterfaceLookup, NetworkingConfig};

/// Device names are this prefix followed by the network index.
pub const DEVICE_PREFIX: &str = "vmnet";

/// Errors that stop a networking log from being replayed at all.
#[derive(Debug, Error)]
pub enum NetworkingError {
    /// Failed to read the log handle.
    #[error("failed to read networking file: {0}")]
    Io(#[from] std::io::Error),
    #[error("networking file is empty")]
    MissingVersion,
    #[error("unexpected format for version: {0:?}")]
    InvalidVersion(Vec<String>),
    #[error("expected version 1.0 of networking file but received version {0}")]
    UnsupportedVersion(Version),
}

/// The `VERSION=<major>,<minor>` header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
}

impl Version {
    pub const SUPPORTED: Version = Version { major: 1, minor: 0 };

    fn from_row(row: &[String]) -> Result<Self, NetworkingError> {
        let invalid = || NetworkingError::InvalidVersion(row.to_vec());
        match row {
            [only] => only.parse().map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl FromStr for Version {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.strip_prefix("VERSION=").ok_or(())?;
        let (major, minor) = value.split_once(',').ok_or(())?;
        if [major, minor]
            .iter()
            .any(|part| part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(());
        }
        Ok(Self {
            major: major.parse().map_err(|_| ())?,
            minor: minor.parse().map_err(|_| ())?,
        })
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Read and replay a networking log, checking bridge interfaces against this host.
pub fn read_networking_config<R: Read>(reader: R) -> Result<NetworkingConfig, NetworkingError> {
    read_networking_config_with(reader, &HostInterfaces)
}

/// Read and replay a networking log using `interfaces` for bridge checks.
///
/// The version row is validated before any other row is interpreted.
pub fn read_networking_config_with<R: Read>(
    reader: R,
    interfaces: &dyn InterfaceLookup,
) -> Result<NetworkingConfig, NetworkingError> {
    let bytes = consume(reader)?;
    let mut rows = split_rows(tokenize(bytes, &NETWORKING));

    let header = rows.next().ok_or(NetworkingError::MissingVersion)?;
    let version = Version::from_row(&header)?;
    if version != Version::SUPPORTED {
        return Err(NetworkingError::UnsupportedVersion(version));
    }
    debug!(%version, "networking file version accepted");

    Ok(replay(parse_commands(rows), interfaces))
}
