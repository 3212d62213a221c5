use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::filter::{extract_bracketed, take_until};
use crate::hwaddr::MacAddr;

use super::{decode_lease_bytes, serialize_bytes, LeaseError, PartialEntry};

/// One `{ key=value ... }` block of an Apple bootpd lease file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppleLease {
    pub ip_address: Option<String>,
    #[serde(serialize_with = "serialize_bytes")]
    pub hw_address: Option<Vec<u8>>,
    #[serde(serialize_with = "serialize_bytes")]
    pub identifier: Option<Vec<u8>>,
    pub lease: Option<String>,
    pub name: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl AppleLease {
    /// The hardware address, when it is six bytes long.
    pub fn hardware_addr(&self) -> Option<MacAddr> {
        let octets: [u8; 6] = self.hw_address.as_deref()?.try_into().ok()?;
        Some(MacAddr::new(octets))
    }

    fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.ip_address.as_deref())
            .unwrap_or("<unnamed>")
    }

    /// `ip_address`, `hw_address` and `identifier` must all be present.
    fn is_complete(&self) -> bool {
        self.ip_address.is_some() && self.hw_address.is_some() && self.identifier.is_some()
    }

    fn absorb(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.contains('{') || line.contains('}') {
            return;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!("error parsing invalid line: `{line}`");
            return;
        };
        let (key, value) = (key.trim(), value.trim());

        match key {
            "ip_address" => self.ip_address = Some(value.to_string()),
            "hw_address" | "identifier" => match tagged_bytes(value) {
                Some(bytes) if key == "identifier" => self.identifier = Some(bytes),
                Some(bytes) => self.hw_address = Some(bytes),
                None => warn!(
                    "error {key} `{value}` is not properly formatted for entry {}",
                    self.label()
                ),
            },
            "lease" => self.lease = Some(value.to_string()),
            "name" => self.name = Some(value.to_string()),
            _ => {
                self.extra.insert(key.to_string(), value.to_string());
            }
        }
    }
}

/// `<tag>,<mac>` with single-digit octets padded, e.g. `1,0:50:56:20:ac:33`.
fn tagged_bytes(value: &str) -> Option<Vec<u8>> {
    if value.matches(',').count() != 1 {
        return None;
    }
    let (_, mac) = value.split_once(',')?;
    let padded: Vec<String> = mac
        .split(':')
        .map(|octet| {
            if octet.len() == 1 {
                format!("0{octet}")
            } else {
                octet.to_string()
            }
        })
        .collect();
    decode_lease_bytes(&padded.join(":")).ok()
}

/// Read the next lease block from a comment-stripped stream.
///
/// `Ok(None)` means no further block opens.
pub fn next_apple_lease<I>(source: &mut I) -> Result<Option<AppleLease>, PartialEntry<AppleLease>>
where
    I: Iterator<Item = u8>,
{
    let (_, mut block) = extract_bracketed(b'{', b'}', source);
    if !block.is_open() {
        return Ok(None);
    }

    let mut entry = AppleLease::default();
    loop {
        let (line, terminated) = take_until(b'\n', &mut block);
        entry.absorb(&String::from_utf8_lossy(&line));
        if !terminated {
            break;
        }
    }

    if block.is_truncated() {
        return Err(PartialEntry {
            error: LeaseError::Truncated(entry.label().to_string()),
            entry,
        });
    }
    if !entry.is_complete() {
        return Err(PartialEntry {
            error: LeaseError::MissingFields(entry.label().to_string()),
            entry,
        });
    }
    Ok(Some(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease::read_apple_leases;

    const SAMPLE: &str = "{\n\
\tname=vagrant-2019\n\
\tip_address=192.168.111.2\n\
\thw_address=1,0:50:56:20:ac:33\n\
\tidentifier=1,0:50:56:20:ac:33\n\
\tlease=0x5fd72edc\n\
}\n\
{\r\n\
\tname=other\r\n\
\tip_address=192.168.111.3\r\n\
\thw_address=1,0:c:29:1:2:3\r\n\
\tidentifier=ff,0:c:29:1:2:3\r\n\
\tlease=0x5fd72edd\r\n\
\tclient_id=a=b\r\n\
}\n";

    #[test]
    fn reads_blocks_and_pads_octets() {
        let file = read_apple_leases(SAMPLE.as_bytes()).expect("read");
        assert!(file.check().is_ok());
        assert_eq!(file.entries.len(), 2);

        let first = &file.entries[0];
        assert_eq!(first.name.as_deref(), Some("vagrant-2019"));
        assert_eq!(
            first.hardware_addr().map(|mac| mac.to_string()),
            Some("00:50:56:20:ac:33".to_string())
        );

        let second = &file.entries[1];
        assert_eq!(second.hw_address, Some(vec![0x00, 0x0c, 0x29, 0x01, 0x02, 0x03]));
        assert_eq!(second.extra["client_id"], "a=b");
        assert_eq!(second.lease.as_deref(), Some("0x5fd72edd"));
    }

    #[test]
    fn missing_mandatory_fields_is_an_error_with_partial_entry() {
        let file = read_apple_leases(
            "{\nname=broken\nip_address=10.0.0.5\nhw_address=0:50:56:20:ac:33\n}\n".as_bytes(),
        )
        .expect("read");
        assert!(file.entries.is_empty());
        assert_eq!(file.failures.len(), 1);
        assert_eq!(file.failures[0].entry.ip_address.as_deref(), Some("10.0.0.5"));
        assert!(matches!(
            file.failures[0].error,
            LeaseError::MissingFields(ref label) if label == "broken"
        ));
    }

    #[test]
    fn repeated_field_does_not_stand_in_for_a_missing_one() {
        let file = read_apple_leases(
            "{\nname=dup\nip_address=10.0.0.5\nip_address=10.0.0.5\nhw_address=1,0:50:56:20:ac:33\n}\n"
                .as_bytes(),
        )
        .expect("read");
        assert!(file.entries.is_empty());
        assert_eq!(file.failures.len(), 1);
        assert_eq!(file.failures[0].entry.identifier, None);
        assert!(matches!(
            file.failures[0].error,
            LeaseError::MissingFields(ref label) if label == "dup"
        ));
    }

    #[test]
    fn comments_and_trailing_text_end_cleanly() {
        let mut source = b"# only a comment\n\n".to_vec().into_iter();
        assert_eq!(next_apple_lease(&mut source), Ok(None));
    }

    #[test]
    fn tag_must_be_single() {
        assert_eq!(tagged_bytes("1,2,0:0:0:0:0:0"), None);
        assert_eq!(tagged_bytes("0:50:56:20:ac:33"), None);
        assert_eq!(tagged_bytes("1,a:b:c:d:e:f").map(|b| b.len()), Some(6));
    }
}
