#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SYNC_VARS: &[&str] = &[
    "MONGO_URI",
    "DATABASE_NAME",
    "SHEET_ID",
    "SHEETSYNC_ACCESS_TOKEN",
    "SHEETSYNC_CONFIG",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "GOOGLE_TYPE",
    "GOOGLE_PROJECT_ID",
    "GOOGLE_PRIVATE_KEY_ID",
    "GOOGLE_PRIVATE_KEY",
    "GOOGLE_CLIENT_EMAIL",
    "GOOGLE_CLIENT_ID",
    "PORT",
];

/// `sheetsync` with none of the sync variables inherited from the caller.
fn sheetsync() -> Command {
    let mut cmd = Command::cargo_bin("sheetsync").unwrap();
    for var in SYNC_VARS {
        cmd.env_remove(var);
    }
    cmd
}

// ---------------------------------------------------------------------------
// help / usage
// ---------------------------------------------------------------------------

#[test]
fn help_lists_subcommands() {
    sheetsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("collections"));
}

#[test]
fn invalid_port_is_rejected() {
    sheetsync()
        .args(["--port", "not-a-port", "run"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// configuration errors exit 1 before connecting
// ---------------------------------------------------------------------------

#[test]
fn run_without_mongo_uri_fails() {
    sheetsync()
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MONGO_URI is not set"));
}

#[test]
fn default_command_is_run() {
    sheetsync()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MONGO_URI is not set"));
}

#[test]
fn export_without_sheet_id_fails() {
    sheetsync()
        .arg("export")
        .env("MONGO_URI", "mongodb://127.0.0.1:1")
        .env("DATABASE_NAME", "app")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SHEET_ID is not set"));
}

#[test]
fn missing_google_credentials_fail() {
    sheetsync()
        .arg("export")
        .env("MONGO_URI", "mongodb://127.0.0.1:1")
        .env("DATABASE_NAME", "app")
        .env("SHEET_ID", "sheet-1")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GOOGLE_PRIVATE_KEY is not set"));
}

#[test]
fn unreadable_key_file_fails() {
    let dir = TempDir::new().unwrap();
    sheetsync()
        .arg("export")
        .env("MONGO_URI", "mongodb://127.0.0.1:1")
        .env("DATABASE_NAME", "app")
        .env("SHEET_ID", "sheet-1")
        .env(
            "GOOGLE_APPLICATION_CREDENTIALS",
            dir.path().join("missing.json"),
        )
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read key file"));
}

#[test]
fn malformed_tuning_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sheetsync.yaml");
    std::fs::write(&path, "retry: [not, a, map]\n").unwrap();
    sheetsync()
        .arg("--config")
        .arg(&path)
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sheetsync.yaml"));
}

#[test]
fn collections_without_database_name_fails() {
    sheetsync()
        .arg("collections")
        .env("MONGO_URI", "mongodb://127.0.0.1:1")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DATABASE_NAME is not set"));
}

// ---------------------------------------------------------------------------
// .env
// ---------------------------------------------------------------------------

#[test]
fn dotenv_in_working_directory_is_loaded() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        "MONGO_URI=mongodb://127.0.0.1:1\n",
    )
    .unwrap();
    sheetsync()
        .arg("collections")
        .current_dir(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MONGO_URI is not set").not())
        .stderr(predicate::str::contains("DATABASE_NAME is not set"));
}

#[test]
fn dotenv_feeds_flag_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".env"), "PORT=not-a-port\n").unwrap();
    sheetsync()
        .arg("run")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not-a-port"));
}

#[test]
fn environment_wins_over_dotenv() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".env"), "MONGO_URI=mongodb://127.0.0.1:1\n").unwrap();
    sheetsync()
        .arg("collections")
        .current_dir(dir.path())
        .env("MONGO_URI", " ")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MONGO_URI is not set"));
}
