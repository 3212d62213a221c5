use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::filter::{extract_bracketed, take_until};
use crate::hwaddr::MacAddr;

use super::{decode_lease_bytes, serialize_bytes, LeaseError, PartialEntry};

const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("lease line pattern is valid")
}

static LEASE: LazyLock<Regex> = LazyLock::new(|| pattern(r"lease\s+(.+?)\s*$"));
static STARTS: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\s*starts\s+(\d+)\s+(.+?)\s*$"));
static ENDS: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\s*ends\s+(\d+)\s+(.+?)\s*$"));
static HARDWARE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^\s*hardware\s+ethernet\s+(.+?)\s*$"));
static UID: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\s*uid\s+(.+?)\s*$"));

/// One `lease <address> { ... }` block of an ISC `dhcpd.leases` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IscLease {
    pub address: String,
    pub starts: Option<NaiveDateTime>,
    pub starts_weekday: Option<u8>,
    pub ends: Option<NaiveDateTime>,
    pub ends_weekday: Option<u8>,
    #[serde(serialize_with = "serialize_bytes")]
    pub hardware: Option<Vec<u8>>,
    #[serde(serialize_with = "serialize_bytes")]
    pub uid: Option<Vec<u8>>,
    /// Statements that are not interpreted, trimmed.
    pub extra: Vec<String>,
}

impl IscLease {
    /// The hardware address, when it is six bytes long.
    pub fn hardware_addr(&self) -> Option<MacAddr> {
        let octets: [u8; 6] = self.hardware.as_deref()?.try_into().ok()?;
        Some(MacAddr::new(octets))
    }

    fn absorb(&mut self, item: &str) {
        let item = item.trim();
        if item.is_empty() {
            return;
        }

        if let Some(caps) = STARTS.captures(item) {
            let (weekday, time) = (&caps[1], &caps[2]);
            self.starts_weekday = self.weekday(weekday, "start");
            self.starts = self.timestamp(time, "start");
            return;
        }
        if let Some(caps) = ENDS.captures(item) {
            let (weekday, time) = (&caps[1], &caps[2]);
            self.ends_weekday = self.weekday(weekday, "end");
            self.ends = self.timestamp(time, "end");
            return;
        }
        if let Some(caps) = HARDWARE.captures(item) {
            self.hardware = self.bytes(&caps[1], "hardware ethernet address");
            return;
        }
        if let Some(caps) = UID.captures(item) {
            self.uid = self.bytes(&caps[1], "uid");
            return;
        }
        if item.ends_with('}') {
            return;
        }
        self.extra.push(item.to_string());
    }

    fn weekday(&self, text: &str, which: &str) -> Option<u8> {
        match text.parse() {
            Ok(day) => Some(day),
            Err(_) => {
                warn!("error parsing {which} weekday ({text}) for entry {}", self.address);
                None
            }
        }
    }

    fn timestamp(&self, text: &str, which: &str) -> Option<NaiveDateTime> {
        match NaiveDateTime::parse_from_str(text, TIME_FORMAT) {
            Ok(time) => Some(time),
            Err(_) => {
                warn!("error parsing {which} time ({text}) for entry {}", self.address);
                None
            }
        }
    }

    fn bytes(&self, text: &str, which: &str) -> Option<Vec<u8>> {
        match decode_lease_bytes(text) {
            Ok(bytes) => Some(bytes),
            Err(_) => {
                warn!("error parsing {which} ({text}) for entry {}", self.address);
                None
            }
        }
    }
}

/// Read the next lease block from a comment-stripped, newline-free stream.
///
/// `Ok(None)` means the stream is exhausted.
pub fn next_isc_lease<I>(source: &mut I) -> Result<Option<IscLease>, PartialEntry<IscLease>>
where
    I: Iterator<Item = u8>,
{
    let (leading, mut block) = extract_bracketed(b'{', b'}', source);
    let header = String::from_utf8_lossy(&leading);
    let header = header.trim();

    let address = LEASE
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    let Some(address) = address.filter(|_| block.is_open()) else {
        if header.is_empty() && !block.is_open() {
            return Ok(None);
        }
        block.by_ref().for_each(drop);
        return Err(PartialEntry {
            entry: IscLease {
                extra: vec![header.to_string()],
                ..IscLease::default()
            },
            error: LeaseError::Header(header.to_string()),
        });
    };

    let mut entry = IscLease {
        address,
        ..IscLease::default()
    };
    // the opening brace
    block.next();
    loop {
        let (item, terminated) = take_until(b';', &mut block);
        entry.absorb(&String::from_utf8_lossy(&item));
        if !terminated {
            break;
        }
    }

    if block.is_truncated() {
        return Err(PartialEntry {
            error: LeaseError::Truncated(entry.address.clone()),
            entry,
        });
    }
    Ok(Some(entry))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::lease::read_isc_leases;

    const SAMPLE: &str = "# The format of this file is documented in the dhcpd.leases(5) manual page.\n\
lease 192.168.43.129 {\n\
  starts 4 2019/01/03 18:41:11;\n\
  ends 4 2019/01/03 19:11:11;\n\
  hardware ethernet 00:0c:29:ab:cd:ef;\n\
  uid 01:00:0c:29:ab:cd:ef;\n\
  client-hostname \"vm-1\";\n\
}\n\
lease 192.168.43.130 {\n\
  starts 5 2019/01/04 08:00:00;\n\
  ends never;\n\
}\n";

    #[test]
    fn reads_every_block() {
        let file = read_isc_leases(SAMPLE.as_bytes()).expect("read");
        assert!(file.check().is_ok());
        assert_eq!(file.entries.len(), 2);

        let first = &file.entries[0];
        assert_eq!(first.address, "192.168.43.129");
        assert_eq!(first.starts_weekday, Some(4));
        assert_eq!(
            first.starts,
            NaiveDate::from_ymd_opt(2019, 1, 3).and_then(|d| d.and_hms_opt(18, 41, 11))
        );
        assert_eq!(
            first.hardware_addr().map(|mac| mac.to_string()),
            Some("00:0c:29:ab:cd:ef".to_string())
        );
        assert_eq!(first.uid.as_deref().map(<[u8]>::len), Some(7));
        assert_eq!(first.extra, vec!["client-hostname \"vm-1\""]);

        let second = &file.entries[1];
        assert_eq!(second.ends, None);
        assert_eq!(second.extra, vec!["ends never"]);
    }

    #[test]
    fn end_of_stream_is_done_not_error() {
        let mut source = b"  ".to_vec().into_iter();
        assert_eq!(next_isc_lease(&mut source), Ok(None));
    }

    #[test]
    fn mangled_header_yields_partial_entry() {
        let mut source = b"server-duid 1 { x; } lease 10.0.0.9 { ends 1 2020/01/01 00:00:00; }"
            .to_vec()
            .into_iter();
        let partial = next_isc_lease(&mut source).expect_err("mangled");
        assert!(matches!(partial.error, LeaseError::Header(_)));
        assert_eq!(partial.entry.extra, vec!["server-duid 1"]);

        let entry = next_isc_lease(&mut source).expect("entry").expect("present");
        assert_eq!(entry.address, "10.0.0.9");
        assert_eq!(next_isc_lease(&mut source), Ok(None));
    }

    #[test]
    fn truncated_block_keeps_what_was_read() {
        let file = read_isc_leases(
            "lease 10.0.0.1 { hardware ethernet 00:50:56:00:00:01; }\nlease 10.0.0.2 { starts 1 2020/01/01 00:00:00;"
                .as_bytes(),
        )
        .expect("read");
        assert_eq!(file.entries.len(), 1);
        assert_eq!(file.failures.len(), 1);
        assert_eq!(file.failures[0].index, 2);
        assert_eq!(file.failures[0].entry.address, "10.0.0.2");
        assert!(file.failures[0].entry.starts.is_some());
        assert!(file.check().is_err());
    }

    #[test]
    fn bad_field_values_are_logged_and_left_empty() {
        let file = read_isc_leases(b"lease 10.0.0.3 { hardware ethernet 0:1:2; starts 9 yesterday; }".as_slice())
            .expect("read");
        let entry = &file.entries[0];
        assert_eq!(entry.hardware, None);
        assert_eq!(entry.starts, None);
        assert_eq!(entry.starts_weekday, Some(9));
    }
}
