//! CLI integration tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("schema-refs").unwrap()
}

fn write_schema(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod resolve {
    use super::*;

    #[test]
    fn resolves_a_pointer_reference() {
        let dir = TempDir::new().unwrap();
        let schema = write_schema(
            &dir,
            "root.json",
            r##"{"$defs": {"foo": {"type": "boolean"}}}"##,
        );

        cmd()
            .arg("resolve")
            .arg(&schema)
            .arg("--ref")
            .arg("#/$defs/foo")
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""type":"boolean""#));
    }

    #[test]
    fn resolves_across_files() {
        let dir = TempDir::new().unwrap();
        write_schema(&dir, "leaf.json", r##"{"$defs": {"x": {"const": 1}}}"##);
        let schema = write_schema(
            &dir,
            "root.json",
            r##"{"$defs": {"alias": {"$ref": "file:///leaf.json#/$defs/x"}}}"##,
        );

        cmd()
            .arg("resolve")
            .arg(&schema)
            .arg("--ref")
            .arg("#/$defs/alias")
            .arg("--root-dir")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""const":1"#));
    }

    #[test]
    fn unresolvable_reference_fails_with_schema_error() {
        let dir = TempDir::new().unwrap();
        let schema = write_schema(&dir, "root.json", r#"{"$defs": {"foo": true}}"#);

        cmd()
            .arg("resolve")
            .arg(&schema)
            .arg("--ref")
            .arg("#/$defs/missing")
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains(r#"unknown key "missing""#));
    }

    #[test]
    fn missing_schema_file_is_an_io_error() {
        cmd()
            .arg("resolve")
            .arg("/nonexistent/schema.json")
            .arg("--ref")
            .arg("#")
            .assert()
            .failure()
            .code(3);
    }
}

mod identifiers {
    use super::*;

    #[test]
    fn prints_the_identifier_map() {
        let dir = TempDir::new().unwrap();
        let schema = write_schema(
            &dir,
            "root.json",
            r##"{
                "$id": "https://example.com/root.json",
                "$defs": {
                    "A": {"$anchor": "foo"},
                    "B": {"$id": "other.json"}
                }
            }"##,
        );

        cmd()
            .arg("identifiers")
            .arg(&schema)
            .arg("--pretty")
            .assert()
            .success()
            .stdout(predicate::str::contains("/$defs/A"))
            .stdout(predicate::str::contains(
                "https://example.com/root.json#foo",
            ))
            .stdout(predicate::str::contains(
                "https://example.com/other.json#",
            ));
    }

    #[test]
    fn invalid_json_is_a_schema_error() {
        let dir = TempDir::new().unwrap();
        let schema = write_schema(&dir, "broken.json", "not json");

        cmd()
            .arg("identifiers")
            .arg(&schema)
            .assert()
            .failure()
            .code(2);
    }
}

mod check_pointer {
    use super::*;

    #[test]
    fn accepts_valid_reference_pointers() {
        cmd()
            .arg("check-pointer")
            .arg("#/properties/foo")
            .assert()
            .success()
            .stdout(predicate::str::contains("valid"));
    }

    #[test]
    fn rejects_unknown_keywords() {
        cmd()
            .arg("check-pointer")
            .arg("#/foo")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("unknown keyword"));
    }

    #[test]
    fn rejects_invalid_escapes() {
        cmd()
            .arg("check-pointer")
            .arg("/properties/fo~ao")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("invalid escape sequence: ~a"));
    }
}
