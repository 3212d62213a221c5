use colored::Colorize;
use vmnet_conf_core::lease::encode_lease_bytes;
use vmnet_conf_core::networking::DEVICE_PREFIX;
use vmnet_conf_core::{
    AppleLease, ConfigDeclaration, IscLease, LeaseFile, NetworkMap, NetworkingConfig,
};

use crate::lookup::MacBinding;

/// Render resolved declarations, one block each with the path highlighted.
pub fn render_declarations<'a, I>(declarations: I) -> String
where
    I: IntoIterator<Item = &'a ConfigDeclaration>,
{
    let mut out = Vec::new();
    for decl in declarations {
        let text = decl.to_string();
        let mut lines = text.lines();
        if let Some(path) = lines.next() {
            out.push(path.cyan().bold().to_string());
        }
        out.extend(lines.map(|line| format!("  {line}")));
    }
    out.join("\n")
}

/// Render every `networkN.attr = "value"` row.
pub fn render_network_map(map: &NetworkMap) -> String {
    let mut out = Vec::new();
    for row in map.rows() {
        out.push(row.network.cyan().to_string());
        for (attribute, value) in &row.attributes {
            out.push(format!("  {attribute} = {value:?}"));
        }
    }
    out.join("\n")
}

/// Render replayed tables, network roles, warnings and rejected rows.
pub fn render_networking(config: &NetworkingConfig) -> String {
    let mut out = Vec::new();

    out.push("networks".cyan().bold().to_string());
    for (network, kind) in config.network_types() {
        out.push(format!("  {DEVICE_PREFIX}{network}: {kind}"));
    }

    out.push("answers".cyan().bold().to_string());
    for (network, table) in config.answers() {
        for (key, value) in table {
            out.push(format!("  VNET_{network}_{key} = {value}"));
        }
    }

    out.push("nat port forwards".cyan().bold().to_string());
    for (network, table) in config.nat_port_forwards() {
        for (port, target) in table {
            out.push(format!("  {DEVICE_PREFIX}{network} {port} => {target}"));
        }
    }

    out.push("dhcp reservations".cyan().bold().to_string());
    for (network, table) in config.dhcp_mac_to_ip() {
        for (mac, ip) in table {
            out.push(format!("  {DEVICE_PREFIX}{network} {mac} => {ip}"));
        }
    }

    out.push("bridge mappings".cyan().bold().to_string());
    for (interface, network) in config.bridge_mappings() {
        out.push(format!("  {interface} => {DEVICE_PREFIX}{network}"));
    }

    out.push("nat prefixes".cyan().bold().to_string());
    for (network, prefixes) in config.nat_prefixes() {
        let list: Vec<String> = prefixes.iter().map(|bits| format!("/{bits}")).collect();
        out.push(format!("  {DEVICE_PREFIX}{network} {}", list.join(" ")));
    }

    for warning in config.warnings() {
        out.push(format!("warning: {warning}").yellow().to_string());
    }
    for rejected in config.rejected() {
        out.push(format!("rejected: {rejected}").red().to_string());
    }

    out.join("\n")
}

/// Render ISC lease entries followed by any failed blocks.
pub fn render_isc_leases(file: &LeaseFile<IscLease>) -> String {
    let mut out = Vec::new();
    for lease in &file.entries {
        let mut line = format!("lease {}", lease.address.green());
        if let Some(hardware) = &lease.hardware {
            line.push_str(&format!(" hardware={}", encode_lease_bytes(hardware)));
        }
        if let Some(starts) = lease.starts {
            line.push_str(&format!(" starts={starts}"));
        }
        if let Some(ends) = lease.ends {
            line.push_str(&format!(" ends={ends}"));
        }
        out.push(line);
    }
    push_failures(&mut out, file);
    out.join("\n")
}

/// Render Apple lease entries followed by any failed blocks.
pub fn render_apple_leases(file: &LeaseFile<AppleLease>) -> String {
    let mut out = Vec::new();
    for lease in &file.entries {
        let address = lease.ip_address.as_deref().unwrap_or("-");
        let mut line = format!("lease {}", address.green());
        if let Some(name) = &lease.name {
            line.push_str(&format!(" name={name}"));
        }
        if let Some(hardware) = &lease.hw_address {
            line.push_str(&format!(" hardware={}", encode_lease_bytes(hardware)));
        }
        if let Some(lease_time) = &lease.lease {
            line.push_str(&format!(" lease={lease_time}"));
        }
        out.push(line);
    }
    push_failures(&mut out, file);
    out.join("\n")
}

fn push_failures<T>(out: &mut Vec<String>, file: &LeaseFile<T>) {
    for failure in &file.failures {
        out.push(
            format!("! entry #{}: {}", failure.index, failure.error)
                .red()
                .to_string(),
        );
    }
}

/// Render MAC bindings, one per line.
pub fn render_bindings(bindings: &[MacBinding]) -> String {
    bindings
        .iter()
        .map(|binding| {
            format!(
                "{} {}",
                binding.address.green(),
                format!("[{}] {}", binding.source, binding.origin).dimmed()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use vmnet_conf_core::{parse_dhcp_config, read_isc_leases};

    use super::*;

    #[test]
    fn declarations_are_indented_under_their_path() {
        colored::control::set_override(false);
        let config = parse_dhcp_config(b"option routers 10.0.0.1; group { max-lease-time 60; }")
            .expect("dhcp");
        let text = render_declarations(&config);
        assert!(text.starts_with("{global}\n  options : {\"routers\": \"10.0.0.1\"}"), "{text}");
        assert!(text.contains("{global},{group}\n"));
        assert!(text.contains("  parameters : {\"max-lease-time\": \"60\"}"));
    }

    #[test]
    fn lease_failures_follow_entries() {
        colored::control::set_override(false);
        let file = read_isc_leases(
            "lease 10.0.0.1 { hardware ethernet 00:50:56:00:00:01; }\nlease 10.0.0.2 {".as_bytes(),
        )
        .expect("leases");
        let text = render_isc_leases(&file);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "lease 10.0.0.1 hardware=00:50:56:00:00:01");
        assert!(lines[1].starts_with("! entry #2: lease entry 10.0.0.2"));
    }
}
