use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn pathbind() -> Command {
    Command::cargo_bin("pathbind").unwrap()
}

fn temp_json(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "{}", content).unwrap();
    f.flush().unwrap();
    f
}

#[test]
fn tokenize_prints_tokens() {
    pathbind()
        .args(["tokenize", "addresses.0.city"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"{"segment":"addresses","next":"sequence"}"#,
        ))
        .stdout(predicate::str::contains(r#"{"segment":"city","next":null}"#));
}

#[test]
fn get_reads_from_stdin() {
    pathbind()
        .args(["get", "--input", "-", "--path", "users.0.name"])
        .write_stdin(r#"{"users": [{"name": "Ann"}]}"#)
        .assert()
        .success()
        .stdout("\"Ann\"\n");
}

#[test]
fn get_missing_prints_null() {
    let f = temp_json(r#"{"a": 1}"#);
    pathbind()
        .args(["get", "--path", "b.c", "--input"])
        .arg(f.path())
        .assert()
        .success()
        .stdout("null\n");
}

#[test]
fn set_creates_containers() {
    pathbind()
        .args(["set", "-i", "-", "-p", "addresses.0.city", "--value", "\"Lisbon\""])
        .write_stdin("{}")
        .assert()
        .success()
        .stdout("{\"addresses\":[{\"city\":\"Lisbon\"}]}\n");
}

#[test]
fn set_through_leaf_fails() {
    pathbind()
        .args(["set", "-i", "-", "-p", "a.b", "--value", "1"])
        .write_stdin(r#"{"a": 1}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not address a container"));
}

#[test]
fn collections_nests_listing() {
    let f = temp_json(
        r#"{"value": [
            {"name": "root", "friendlyName": "Root"},
            {"name": "it", "friendlyName": "IT",
             "parentCollection": {"referenceName": "root", "type": "CollectionReference"}}
        ]}"#,
    );
    pathbind()
        .args(["collections", "--input"])
        .arg(f.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#""collections":[{"name":"it","friendlyName":"IT","collections":[]}]"#,
        ));
}

#[test]
fn policy_add_user_pretty() {
    let f = temp_json(
        r#"{
            "id": "p1",
            "name": "policy_it",
            "version": 1,
            "properties": {
                "collection": {"type": "CollectionReference", "referenceName": "it"},
                "attributeRules": []
            }
        }"#,
    );
    pathbind()
        .args([
            "policy",
            "add-user",
            "--rule",
            "purviewmetadatarole_builtin_purview-reader",
            "--user",
            "u-42",
            "--pretty",
            "--input",
        ])
        .arg(f.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"id\": \"purviewmetadatarole_builtin_purview-reader:it\"",
        ))
        .stdout(predicate::str::contains("\"u-42\""));
}

#[test]
fn unreadable_input_reports_path() {
    pathbind()
        .args(["get", "--input", "/nonexistent/file.json", "--path", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn set_huge_index_fails_cleanly() {
    pathbind()
        .args(["set", "-i", "-", "-p", "items.18446744073709551615", "--value", "1"])
        .write_stdin(r#"{"items": [1, 2, 3]}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is too large"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn invalid_stdin_json_reports_parse_error() {
    pathbind()
        .args(["get", "--input", "-", "--path", "a"])
        .write_stdin("{not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}

#[test]
fn non_utf8_stdin_reports_read_error() {
    pathbind()
        .args(["get", "--input", "-", "--path", "a"])
        .write_stdin(vec![0xff, 0xfe, 0xfd])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read stdin"));
}
