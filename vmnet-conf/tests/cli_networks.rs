use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn netmap_lists_rows() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vmnet-conf"));
    cmd.arg("netmap")
        .arg(fixture("fixtures/netmap.conf"))
        .assert()
        .success()
        .stdout(predicate::str::contains("network1"))
        .stdout(predicate::str::contains("name = \"HostOnly\""));
}

#[test]
fn netmap_lookups_are_case_insensitive() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vmnet-conf"));
    cmd.arg("netmap")
        .arg(fixture("fixtures/netmap.conf"))
        .arg("--name")
        .arg("nat")
        .assert()
        .success()
        .stdout("vmnet8\n");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vmnet-conf"));
    cmd.arg("netmap")
        .arg(fixture("fixtures/netmap.conf"))
        .arg("--device")
        .arg("VMNET1")
        .assert()
        .success()
        .stdout("HostOnly\n");
}

#[test]
fn netmap_unknown_name_fails() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vmnet-conf"));
    cmd.arg("netmap")
        .arg(fixture("fixtures/netmap.conf"))
        .arg("--name")
        .arg("lab")
        .assert()
        .failure()
        .stderr(predicate::str::contains("lab"));
}

#[test]
fn networking_prints_tables_and_rejected_rows() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vmnet-conf"));
    cmd.arg("networking")
        .arg(fixture("fixtures/networking"))
        .assert()
        .success()
        .stdout(predicate::str::contains("vmnet2: bridged"))
        .stdout(predicate::str::contains("vmnet3: hostonly"))
        .stdout(predicate::str::contains("vmnet8 tcp/2222 => 172.16.41.20:22"))
        .stdout(predicate::str::contains("vmnet8 /24"))
        .stdout(predicate::str::contains("rejected: unable to parse command frobnicate 1 2 3"));
}

#[test]
fn networking_name_lookup() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vmnet-conf"));
    cmd.arg("networking")
        .arg(fixture("fixtures/networking"))
        .arg("--name")
        .arg("HostOnly")
        .assert()
        .success()
        .stdout("vmnet1\nvmnet3\n");
}

#[test]
fn networking_json_includes_classification() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vmnet-conf"));
    let output = cmd
        .arg("networking")
        .arg(fixture("fixtures/networking"))
        .arg("--format")
        .arg("json")
        .output()
        .expect("run");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["networks"]["8"], "nat");
    assert_eq!(json["nat_port_forwards"]["8"]["tcp/2222"], "172.16.41.20:22");
    assert_eq!(json["nat_prefixes"]["8"], serde_json::json!([24]));
}

#[test]
fn networking_rejects_unsupported_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("networking");
    std::fs::write(&path, "VERSION=2,0\nanswer VNET_1_DHCP yes\n").expect("write");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vmnet-conf"));
    cmd.arg("networking")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("received version 2.0"));
}
