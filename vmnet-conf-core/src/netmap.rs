//! `netmap.conf` parsing: `networkN.attribute = "value"` assignments.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::io::Read;
use std::str::Chars;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::filter::{consume, strip_comments, CommentEnd};
use crate::mapper::{LookupError, NetworkNameMapper};
use crate::token::{tokenize, Token, NETWORK_MAP};

/// Errors that can occur while parsing a network map.
#[derive(Debug, Error)]
pub enum NetworkMapError {
    /// Failed to read the map handle.
    #[error("failed to read network map: {0}")]
    Io(#[from] std::io::Error),
    #[error("assignment {row}: network index missing before `.`: {tokens:?}")]
    MissingNetwork { row: usize, tokens: Vec<String> },
    #[error("assignment {row}: assigned to empty attribute: {tokens:?}")]
    MissingAttribute { row: usize, tokens: Vec<String> },
    #[error("assignment {row}: invalid attribute assignment: {tokens:?}")]
    InvalidAssignment { row: usize, tokens: Vec<String> },
    #[error("assignment {row}: value {value} is not a valid quoted string")]
    Unquote { row: usize, value: String },
}

/// Attributes declared for one network key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkMapRow {
    /// The key before the `.`, e.g. `network0`.
    pub network: String,
    pub attributes: BTreeMap<String, String>,
}

impl NetworkMapRow {
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").map(String::as_str)
    }

    pub fn device(&self) -> Option<&str> {
        self.attributes.get("device").map(String::as_str)
    }
}

/// Rows of a network map, ordered by network key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NetworkMap {
    rows: Vec<NetworkMapRow>,
}

impl NetworkMap {
    pub fn rows(&self) -> &[NetworkMapRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a network map from `reader`.
pub fn read_network_map<R: Read>(reader: R) -> Result<NetworkMap, NetworkMapError> {
    let bytes = consume(reader)?;
    let tokens = tokenize(strip_comments(bytes, CommentEnd::Keep), &NETWORK_MAP);
    let map = parse_network_map(tokens)?;
    debug!(networks = map.len(), "parsed network map");
    Ok(map)
}

/// Build a network map from its token stream.
pub fn parse_network_map<I>(tokens: I) -> Result<NetworkMap, NetworkMapError>
where
    I: IntoIterator<Item = Token>,
{
    let mut grouped: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    let mut state: Vec<String> = Vec::new();
    let mut row = 1;

    for token in tokens {
        match token {
            Token::Symbol('.') => {
                if state.len() != 1 {
                    return Err(NetworkMapError::MissingNetwork { row, tokens: state });
                }
            }
            Token::Symbol('=') => {
                if state.len() != 2 {
                    return Err(NetworkMapError::MissingAttribute { row, tokens: state });
                }
            }
            Token::Newline => {
                if state.is_empty() {
                    continue;
                }
                assign(&mut grouped, row, std::mem::take(&mut state))?;
                row += 1;
            }
            other => state.push(other.into_text()),
        }
    }
    if !state.is_empty() {
        assign(&mut grouped, row, state)?;
    }

    let rows = grouped
        .into_iter()
        .map(|(network, attributes)| NetworkMapRow {
            network,
            attributes,
        })
        .collect();
    Ok(NetworkMap { rows })
}

fn assign(
    grouped: &mut BTreeMap<String, BTreeMap<String, String>>,
    row: usize,
    state: Vec<String>,
) -> Result<(), NetworkMapError> {
    let [network, attribute, value]: [String; 3] = state
        .try_into()
        .map_err(|tokens| NetworkMapError::InvalidAssignment { row, tokens })?;
    let value = unquote(&value).ok_or(NetworkMapError::Unquote { row, value })?;
    grouped.entry(network).or_default().insert(attribute, value);
    Ok(())
}

/// Strip the surrounding quotes and resolve C-style escapes.
///
/// Accepts `\a \b \f \n \r \t \v \\ \"`, `\xHH`, three-digit octal,
/// `\uHHHH` and `\UHHHHHHHH`. Literal tabs pass through; a bare `"` or
/// newline inside the quotes is rejected.
fn unquote(value: &str) -> Option<String> {
    let body = value.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\n' => return None,
            '\\' => unescape(&mut chars, &mut out)?,
            c => out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
        }
    }
    String::from_utf8(out).ok()
}

fn unescape(chars: &mut Chars<'_>, out: &mut Vec<u8>) -> Option<()> {
    let byte = match chars.next()? {
        'a' => 0x07,
        'b' => 0x08,
        'f' => 0x0c,
        'n' => b'\n',
        'r' => b'\r',
        't' => b'\t',
        'v' => 0x0b,
        '\\' => b'\\',
        '"' => b'"',
        'x' => u8::try_from(digits(chars, 2, 16)?).ok()?,
        'u' => return push_char(digits(chars, 4, 16)?, out),
        'U' => return push_char(digits(chars, 8, 16)?, out),
        first @ '0'..='7' => {
            let high = first.to_digit(8)?;
            u8::try_from(high * 64 + digits(chars, 2, 8)?).ok()?
        }
        _ => return None,
    };
    out.push(byte);
    Some(())
}

fn digits(chars: &mut Chars<'_>, count: usize, radix: u32) -> Option<u32> {
    (0..count).try_fold(0u32, |acc, _| {
        Some(acc.checked_mul(radix)? + chars.next()?.to_digit(radix)?)
    })
}

fn push_char(code: u32, out: &mut Vec<u8>) -> Option<()> {
    let c = char::from_u32(code)?;
    out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
    Some(())
}

impl NetworkNameMapper for NetworkMap {
    fn name_into_devices(&self, name: &str) -> Result<Vec<String>, LookupError> {
        let devices: Vec<String> = self
            .rows
            .iter()
            .filter(|row| row.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .filter_map(|row| row.device().map(str::to_string))
            .collect();
        if devices.is_empty() {
            return Err(LookupError::UnknownName(name.to_string()));
        }
        Ok(devices)
    }

    fn device_into_name(&self, device: &str) -> Result<String, LookupError> {
        self.rows
            .iter()
            .filter(|row| row.device().is_some_and(|d| d.eq_ignore_ascii_case(device)))
            .find_map(|row| row.name().map(str::to_string))
            .ok_or_else(|| LookupError::UnknownDevice(device.to_string()))
    }
}

impl Display for NetworkMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            for (attribute, value) in &row.attributes {
                writeln!(f, "{}.{attribute} = {value:?}", row.network)?;
            }
        }
        Ok(())
    }
}
