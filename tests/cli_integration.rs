// CLI integration tests for the local phonebook flows.
use std::process::Command;

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_dialdex");
    Command::new(exe)
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

#[test]
fn add_list_update_remove_flow() {
    let temp = tempfile::tempdir().expect("tempdir");
    let data_dir = temp.path().join("books");
    let dir = data_dir.to_str().unwrap();

    let add = cmd()
        .args(["--dir", dir, "add", "Ada", "123"])
        .output()
        .expect("add");
    assert!(add.status.success());
    let add_json = parse_json(std::str::from_utf8(&add.stdout).expect("utf8"));
    let id = add_json["person"]["id"].as_str().expect("id").to_string();
    assert_eq!(id.len(), 24);
    assert_eq!(add_json["person"]["name"], "Ada");
    assert_eq!(add_json["person"]["number"], "123");

    let list = cmd()
        .args(["--dir", dir, "list"])
        .output()
        .expect("list");
    assert!(list.status.success());
    let list_json = parse_json(std::str::from_utf8(&list.stdout).expect("utf8"));
    let persons = list_json["persons"].as_array().expect("persons");
    assert_eq!(persons.len(), 1);
    assert_eq!(persons[0]["id"].as_str().unwrap(), id);

    let update = cmd()
        .args(["--dir", dir, "update", &id, "Ada Lovelace", "999"])
        .output()
        .expect("update");
    assert!(update.status.success());
    let update_json = parse_json(std::str::from_utf8(&update.stdout).expect("utf8"));
    assert_eq!(update_json["person"]["id"].as_str().unwrap(), id);
    assert_eq!(update_json["person"]["name"], "Ada Lovelace");

    let get = cmd()
        .args(["--dir", dir, "get", &id])
        .output()
        .expect("get");
    assert!(get.status.success());
    let get_json = parse_json(std::str::from_utf8(&get.stdout).expect("utf8"));
    assert_eq!(get_json["person"]["number"], "999");

    let remove = cmd()
        .args(["--dir", dir, "remove", &id])
        .output()
        .expect("remove");
    assert!(remove.status.success());
    let remove_json = parse_json(std::str::from_utf8(&remove.stdout).expect("utf8"));
    assert_eq!(remove_json["removed"]["id"].as_str().unwrap(), id);

    let get_again = cmd()
        .args(["--dir", dir, "get", &id])
        .output()
        .expect("get again");
    assert_eq!(get_again.status.code().unwrap(), 3);
}

#[test]
fn duplicate_name_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().to_str().unwrap().to_string();

    let add = cmd()
        .args(["--dir", &dir, "add", "Ada", "123"])
        .output()
        .expect("add");
    assert!(add.status.success());

    let again = cmd()
        .args(["--dir", &dir, "add", "Ada", "999"])
        .output()
        .expect("add again");
    assert_eq!(again.status.code().unwrap(), 4);
    let err_json = parse_json(std::str::from_utf8(&again.stderr).expect("utf8"));
    assert_eq!(err_json["error"]["kind"], "AlreadyExists");
}

#[test]
fn malformed_id_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().to_str().unwrap().to_string();

    let get = cmd()
        .args(["--dir", &dir, "get", "not-an-id"])
        .output()
        .expect("get");
    assert_eq!(get.status.code().unwrap(), 2);
    let err_json = parse_json(std::str::from_utf8(&get.stderr).expect("utf8"));
    assert_eq!(err_json["error"]["kind"], "Usage");
}

#[test]
fn empty_field_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().to_str().unwrap().to_string();

    // Same pre-check as the HTTP surface: empty values are a usage error.
    let add = cmd()
        .args(["--dir", &dir, "add", "Ada", ""])
        .output()
        .expect("add");
    assert_eq!(add.status.code().unwrap(), 2);
    let err_json = parse_json(std::str::from_utf8(&add.stderr).expect("utf8"));
    assert_eq!(err_json["error"]["kind"], "Usage");

    let list = cmd()
        .args(["--dir", &dir, "list"])
        .output()
        .expect("list");
    let list_json = parse_json(std::str::from_utf8(&list.stdout).expect("utf8"));
    assert!(list_json["persons"].as_array().unwrap().is_empty());
}

#[test]
fn info_counts_people() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().to_str().unwrap().to_string();

    let info = cmd()
        .args(["--dir", &dir, "info"])
        .output()
        .expect("info");
    assert!(info.status.success());
    let text = String::from_utf8_lossy(&info.stdout).to_string();
    assert!(text.contains("info for 0 people"));

    for (name, number) in [("Ada", "123"), ("Grace", "456")] {
        let add = cmd()
            .args(["--dir", &dir, "add", name, number])
            .output()
            .expect("add");
        assert!(add.status.success());
    }

    let info = cmd()
        .args(["--dir", &dir, "info"])
        .output()
        .expect("info");
    let text = String::from_utf8_lossy(&info.stdout).to_string();
    assert!(text.contains("info for 2 people"));
}

#[test]
fn books_are_isolated_by_name() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().to_str().unwrap().to_string();

    let add = cmd()
        .args(["--dir", &dir, "--book", "work", "add", "Ada", "123"])
        .output()
        .expect("add");
    assert!(add.status.success());

    let home = cmd()
        .args(["--dir", &dir, "list"])
        .output()
        .expect("list home");
    let home_json = parse_json(std::str::from_utf8(&home.stdout).expect("utf8"));
    assert!(home_json["persons"].as_array().unwrap().is_empty());

    let work = cmd()
        .args(["--dir", &dir, "--book", "work", "list"])
        .output()
        .expect("list work");
    let work_json = parse_json(std::str::from_utf8(&work.stdout).expect("utf8"));
    assert_eq!(work_json["persons"].as_array().unwrap().len(), 1);
}
