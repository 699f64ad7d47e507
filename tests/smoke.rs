//! Smoke tests -- verify the binary runs and key subcommands load.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("chargewatch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Charging connector status monitor"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("chargewatch")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("chargewatch"));
}

#[test]
fn test_run_subcommand_exists() {
    Command::cargo_bin("chargewatch")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--bind"));
}

#[test]
fn test_replay_empty_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("chargewatch.toml");
    std::fs::write(
        &config,
        format!(
            "[log]\npath = \"{}\"\n",
            dir.path().join("charger_log.csv").display()
        ),
    )
    .unwrap();

    Command::cargo_bin("chargewatch")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config)
        .arg("replay")
        .assert()
        .success()
        .stdout(predicates::str::contains("No transitions recorded yet."));
}

#[test]
fn test_replay_reads_existing_segments() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("2025-12_charger_log.csv"),
        "\u{feff}Timestamp,ChargerID,OldStatus,NewStatus,Duration\n\
         2025-12-01 09:00:00,TW-001,N/A,online,N/A\n\
         2025-12-01 09:03:00,TW-001,online,offline,3 minutes\n",
    )
    .unwrap();
    let config = dir.path().join("chargewatch.toml");
    std::fs::write(
        &config,
        format!(
            "[log]\npath = \"{}\"\n",
            dir.path().join("charger_log.csv").display()
        ),
    )
    .unwrap();

    Command::cargo_bin("chargewatch")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .args(["replay", "--json"])
        .assert()
        .success()
        .stdout(predicates::str::contains("\"status\": \"offline\""));
}

#[test]
fn test_check_requires_source_url() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("chargewatch.toml");
    std::fs::write(&config, "[monitor]\npoll_interval_secs = 60\n").unwrap();

    Command::cargo_bin("chargewatch")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicates::str::contains("source.url is not configured"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("chargewatch.toml");
    std::fs::write(&config, "[monitor]\nbatch_size = 0\n").unwrap();

    Command::cargo_bin("chargewatch")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("replay")
        .assert()
        .failure()
        .stderr(predicates::str::contains("batch_size"));
}

#[test]
fn test_config_load_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("chargewatch.toml");
    std::fs::write(
        &config,
        format!(
            "[log]\npath = \"{}\"\n\n[logging]\nlevel = \"info\"\n",
            dir.path().join("charger_log.csv").display()
        ),
    )
    .unwrap();

    Command::cargo_bin("chargewatch")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config)
        .arg("replay")
        .assert()
        .success()
        .stdout(predicates::str::contains("Loaded configuration"));
}
