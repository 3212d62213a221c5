use std::fs::File;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use vmnet_conf_core::dhcp::{DeclarationId, Parameter};
use vmnet_conf_core::{
    parse_dhcp_config, read_dhcp_config, DhcpConfigError, DhcpConfiguration, Grant,
};

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn load() -> DhcpConfiguration {
    let file = File::open(fixture("fixtures/dhcpd.conf")).expect("open fixture");
    read_dhcp_config(file).expect("parse dhcpd.conf")
}

#[test]
fn resolves_every_declaration_in_preorder() {
    let config = load();
    let ids: Vec<String> = config.iter().map(|decl| decl.id().to_string()).collect();
    assert_eq!(
        ids,
        vec![
            "{global}",
            "{subnet4 172.16.41.0/24}",
            "{host name:vmnet8}",
            "{group}",
            "{host name:builder}",
            "{subnet6 fd00:41::/64}",
        ]
    );
}

#[test]
fn host_inherits_from_group_and_global() {
    let config = load();
    let builder = config.host_by_name("Builder").expect("builder host");

    assert_eq!(builder.grants["unknown-clients"], Grant::Deny);
    assert_eq!(builder.parameters["max-lease-time"], "7200");
    assert_eq!(builder.attributes.get("authoritative"), Some(&true));
    assert_eq!(builder.hostid.len(), 1);
    assert_eq!(
        builder.ip4().expect("fixed address"),
        Ipv4Addr::new(172, 16, 41, 20)
    );
    assert_eq!(
        builder.hardware().expect("hardware").to_string(),
        "00:0c:29:5a:01:02"
    );

    assert_eq!(config.global().grants["unknown-clients"], Grant::Allow);
}

#[test]
fn address_parameters_accumulate_from_root_to_leaf() {
    let config = parse_dhcp_config(
        b"subnet 10.0.0.0 netmask 255.255.255.0 {\n\
          range 10.0.0.5 10.0.0.9;\n\
          host h { fixed-address 10.0.0.7; }\n\
          }\n",
    )
    .expect("parse");
    let host = config.host_by_name("h").expect("host");
    assert_eq!(
        host.address,
        vec![
            Parameter::Range4 {
                min: Ipv4Addr::new(10, 0, 0, 5),
                max: Ipv4Addr::new(10, 0, 0, 9),
            },
            Parameter::Address4 {
                addresses: vec!["10.0.0.7".to_string()],
            },
        ]
    );
    assert_eq!(host.ip4().expect("fixed address"), Ipv4Addr::new(10, 0, 0, 7));
}

#[test]
fn subnet_lookup_returns_resolved_subnet() {
    let config = load();
    let subnet = config
        .subnet_by_address(IpAddr::V4(Ipv4Addr::new(172, 16, 41, 200)))
        .expect("subnet");
    assert_eq!(subnet.options["routers"], "172.16.41.2");
    assert!(subnet.address.iter().any(|p| matches!(
        p,
        Parameter::Range4 { min, .. } if *min == Ipv4Addr::new(172, 16, 41, 128)
    )));

    let v6 = config
        .subnet_by_address("fd00:41::150".parse().expect("ipv6"))
        .expect("subnet6");
    assert!(matches!(v6.id(), DeclarationId::Subnet6(_)));
    assert!(v6
        .address
        .iter()
        .any(|p| matches!(p, Parameter::Prefix6 { bits: 56, .. })));

    assert!(matches!(
        config.subnet_by_address("10.1.1.1".parse().expect("ip")),
        Err(DhcpConfigError::NoMatch { .. })
    ));
}

#[test]
fn host_without_fixed_address_has_no_ip6() {
    let config = load();
    let host = config.host_by_name("vmnet8").expect("vmnet8 host");
    assert!(matches!(
        host.ip6(),
        Err(DhcpConfigError::MissingAddress("IPv6"))
    ));
    assert_eq!(host.options["domain-name"], "\"\"");
}

#[test]
fn serializes_to_json() {
    let config = load();
    let json = serde_json::to_value(&config).expect("json");
    assert_eq!(json[0]["path"][0]["kind"], "global");
    assert_eq!(json[4]["address"][0]["kind"], "hardware");
    assert_eq!(json[4]["address"][0]["address"], "00:0c:29:5a:01:02");
}

#[test]
fn unclosed_scope_fails() {
    let err = read_dhcp_config("subnet 10.0.0.0 netmask 255.0.0.0 { range 10.0.0.5;".as_bytes())
        .expect_err("unclosed");
    assert!(err.to_string().contains("never closed"));
}
