#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

const USER_SCHEMA: &str = r#"
name = "UserAccount"

[table]
name = "users"

[[fields]]
name = "id"
type = "int"
primary_key = true
id_strategy = { kind = "auto" }

[[fields]]
name = "userName"
type = "text"

[[fields]]
name = "loginCount"
type = "int"
primitive = true

[[fields]]
name = "cache"
type = "bytes"
storage = "transient"
"#;

const KEYLESS_SCHEMA: &str = r#"
name = "AuditLine"

[[fields]]
name = "line"
type = "text"
"#;

fn write_schema(name: &str, body: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(format!("{name}.toml"));
    fs::write(&path, body).expect("write schema");
    (dir, path)
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("valid json")
}

#[test]
fn statements_lists_every_shape_as_text() {
    let (_dir, schema) = write_schema("user", USER_SCHEMA);
    let output = cargo_bin_cmd!("tessera")
        .arg("statements")
        .arg("--schema")
        .arg(&schema)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.contains("table:    users"));
    assert!(text.contains("key:      id"));
    assert!(text.contains("UserAccount.insert.INSERT"));
    assert!(text.contains("UserAccount.count_by_condition.SELECT"));
    assert!(text.contains("generated key: id"));
    assert!(!text.contains("skipped"));
}

#[test]
fn statements_json_reports_scripts() {
    let (_dir, schema) = write_schema("user", USER_SCHEMA);
    let output = cargo_bin_cmd!("tessera")
        .args(["--format", "json", "statements", "--schema"])
        .arg(&schema)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json = stdout_json(&output);
    assert_eq!(json["record"], "UserAccount");
    assert_eq!(json["table"], "users");
    let statements = json["statements"].as_array().expect("statements");
    assert_eq!(statements.len(), 10);

    let insert = &statements[0];
    assert_eq!(insert["id"], "UserAccount.insert.INSERT");
    assert_eq!(insert["generated_key"]["column"], "id");
    let script = insert["script"].as_str().expect("script text");
    assert!(script.contains("#{userName}"));
    assert!(script.contains("login_count"));
    assert!(!script.contains("cache"));
}

#[test]
fn keyless_schema_skips_key_operations() {
    let (_dir, schema) = write_schema("audit", KEYLESS_SCHEMA);
    let output = cargo_bin_cmd!("tessera")
        .args(["--format", "json", "statements", "--schema"])
        .arg(&schema)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json = stdout_json(&output);
    assert!(json["key"].is_null());
    let skipped: Vec<_> = json["skipped"]
        .as_array()
        .expect("skipped")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(
        skipped,
        [
            "update_by_id",
            "update_by_id_full",
            "delete_by_id",
            "delete_by_ids",
            "find_by_id",
            "list_by_ids"
        ]
    );
}

#[test]
fn snowflake_ids_carry_the_configured_node() {
    let output = cargo_bin_cmd!("tessera")
        .args(["--format", "json", "id", "--count", "3"])
        .env("TESSERA_DATACENTER_ID", "5")
        .env("TESSERA_WORKER_ID", "6")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json = stdout_json(&output);
    let ids: Vec<i64> = json
        .as_array()
        .expect("array")
        .iter()
        .map(|v| v.as_str().expect("string id").parse().expect("numeric id"))
        .collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    for id in ids {
        assert_eq!((id >> 17) & 0x1f, 5);
        assert_eq!((id >> 12) & 0x1f, 6);
    }
}

#[test]
fn hex_ids_are_thirty_two_characters() {
    let output = cargo_bin_cmd!("tessera")
        .args(["id", "--strategy", "hex", "--count", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_ne!(lines[0], lines[1]);
    assert!(lines
        .iter()
        .all(|line| line.len() == 32 && line.chars().all(|c| c.is_ascii_hexdigit())));
}

#[test]
fn decode_splits_an_id_into_its_parts() {
    let id: i64 = (5_000 << 22) | (2 << 17) | (3 << 12) | 7;
    let output = cargo_bin_cmd!("tessera")
        .args(["--format", "json", "decode"])
        .arg(id.to_string())
        .env("TESSERA_SNOWFLAKE_EPOCH", "1700000000000")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json = stdout_json(&output);
    assert_eq!(json["timestamp_millis"], 1_700_000_005_000_i64);
    assert_eq!(json["datacenter"], 2);
    assert_eq!(json["worker"], 3);
    assert_eq!(json["sequence"], 7);
}

#[test]
fn config_file_feeds_the_generators() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("tessera.toml");
    fs::write(&config, "[snowflake]\ndatacenter_id = 9\nworker_id = 10\n").expect("write config");

    let output = cargo_bin_cmd!("tessera")
        .arg("--config")
        .arg(&config)
        .args(["--format", "json", "id"])
        .env_remove("TESSERA_DATACENTER_ID")
        .env_remove("TESSERA_WORKER_ID")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json = stdout_json(&output);
    let id: i64 = json[0].as_str().expect("string id").parse().expect("numeric id");
    assert_eq!((id >> 17) & 0x1f, 9);
    assert_eq!((id >> 12) & 0x1f, 10);
}

#[test]
fn missing_schema_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    let output = cargo_bin_cmd!("tessera")
        .args(["statements", "--schema"])
        .arg(dir.path().join("nope.toml"))
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8_lossy(&output);
    assert!(stderr.contains("error:"));
}
