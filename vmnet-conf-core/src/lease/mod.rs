//! DHCP lease files: ISC `dhcpd.leases` and Apple bootpd `dhcpd_leases`.
//!
//! Both readers are tolerant. A malformed block produces a partial entry and
//! an error, and reading continues with the next block.

use std::fmt::Write as _;
use std::io::Read;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use crate::filter::{consume, filter_chars, strip_comments, CommentEnd};

mod apple;
mod isc;

pub use apple::{next_apple_lease, AppleLease};
pub use isc::{next_isc_lease, IscLease};

/// Why one lease block could not be read completely.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum LeaseError {
    #[error("unable to parse lease entry ({0:?})")]
    Header(String),
    #[error("lease entry {0} ended before its closing brace")]
    Truncated(String),
    #[error("entry {0} is missing mandatory information")]
    MissingFields(String),
    #[error("bytes are not well-formed ({0})")]
    Bytes(String),
}

/// A block that failed part way, with whatever could be read from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialEntry<T> {
    pub entry: T,
    pub error: LeaseError,
}

/// A failed block and its one-based position in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseFailure<T> {
    pub index: usize,
    pub entry: T,
    pub error: LeaseError,
}

/// Every failure of one lease file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("errors found while parsing {dialect} lease entries: {}", describe(.failures))]
pub struct LeaseErrors {
    pub dialect: &'static str,
    pub failures: Vec<(usize, LeaseError)>,
}

fn describe(failures: &[(usize, LeaseError)]) -> String {
    let mut out = String::new();
    for (position, (index, error)) in failures.iter().enumerate() {
        if position > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "#{index}: {error}");
    }
    out
}

/// Everything read from one lease file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseFile<T> {
    pub dialect: &'static str,
    pub entries: Vec<T>,
    pub failures: Vec<LeaseFailure<T>>,
}

impl<T> LeaseFile<T> {
    /// The aggregated error, if any block failed.
    pub fn check(&self) -> Result<(), LeaseErrors> {
        if self.failures.is_empty() {
            return Ok(());
        }
        Err(LeaseErrors {
            dialect: self.dialect,
            failures: self
                .failures
                .iter()
                .map(|failure| (failure.index, failure.error.clone()))
                .collect(),
        })
    }
}

/// Read every entry of an ISC `dhcpd.leases` file.
pub fn read_isc_leases<R: Read>(reader: R) -> std::io::Result<LeaseFile<IscLease>> {
    let bytes = consume(reader)?;
    let bytes = filter_chars(strip_comments(bytes, CommentEnd::Consume), b"\n\r\x0b");
    Ok(collect_entries("dhcpd", bytes, next_isc_lease))
}

/// Read every entry of an Apple `dhcpd_leases` file.
pub fn read_apple_leases<R: Read>(reader: R) -> std::io::Result<LeaseFile<AppleLease>> {
    let bytes = consume(reader)?;
    let bytes = filter_chars(strip_comments(bytes, CommentEnd::Keep), b"\r\x0b");
    Ok(collect_entries("apple dhcpd", bytes, next_apple_lease))
}

fn collect_entries<T, I, F>(dialect: &'static str, mut bytes: I, mut next: F) -> LeaseFile<T>
where
    I: Iterator<Item = u8>,
    F: FnMut(&mut I) -> Result<Option<T>, PartialEntry<T>>,
{
    let mut file = LeaseFile {
        dialect,
        entries: Vec::new(),
        failures: Vec::new(),
    };
    for index in 1usize.. {
        match next(&mut bytes) {
            Ok(None) => break,
            Ok(Some(entry)) => file.entries.push(entry),
            Err(PartialEntry { entry, error }) => {
                warn!("error parsing {dialect} lease entry #{index}: {error}");
                file.failures.push(LeaseFailure {
                    index,
                    entry,
                    error,
                });
            }
        }
    }
    debug!(
        entries = file.entries.len(),
        failures = file.failures.len(),
        "read {dialect} leases"
    );
    file
}

/// Decode `aa:bb:cc` text; every item must be exactly two hex digits.
pub fn decode_lease_bytes(input: &str) -> Result<Vec<u8>, LeaseError> {
    let mut digits = String::with_capacity(input.len());
    for item in input.split(':') {
        if item.len() != 2 {
            return Err(LeaseError::Bytes(input.to_string()));
        }
        digits.push_str(item);
    }
    hex::decode(&digits).map_err(|_| LeaseError::Bytes(input.to_string()))
}

/// `aa:bb:cc` form of `bytes`.
pub fn encode_lease_bytes(bytes: &[u8]) -> String {
    let encoded = hex::encode(bytes);
    let pairs: Vec<&str> = encoded
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .collect();
    pairs.join(":")
}

fn serialize_bytes<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serializer.serialize_some(&encode_lease_bytes(bytes)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_two_digit_items_only() {
        assert_eq!(
            decode_lease_bytes("00:0c:29:AB:cd:ef").expect("bytes"),
            vec![0x00, 0x0c, 0x29, 0xab, 0xcd, 0xef]
        );
        assert!(decode_lease_bytes("0:0c:29").is_err());
        assert!(decode_lease_bytes("zz:00").is_err());
        assert!(decode_lease_bytes("").is_err());
        assert_eq!(encode_lease_bytes(&[0x01, 0xab]), "01:ab");
    }

    #[test]
    fn aggregated_error_lists_every_failure() {
        let file: LeaseFile<IscLease> = LeaseFile {
            dialect: "dhcpd",
            entries: Vec::new(),
            failures: vec![
                LeaseFailure {
                    index: 2,
                    entry: IscLease::default(),
                    error: LeaseError::Truncated("10.0.0.2".to_string()),
                },
                LeaseFailure {
                    index: 5,
                    entry: IscLease::default(),
                    error: LeaseError::Header("junk".to_string()),
                },
            ],
        };
        let text = file.check().expect_err("failures").to_string();
        assert!(text.contains("#2: lease entry 10.0.0.2"));
        assert!(text.contains("#5: unable to parse"));
    }
}
