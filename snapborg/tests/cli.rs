//! CLI tests: spawn the snapborg binary against scratch configs.
//!
//! Backups run with `--dry-run`, so nothing is mounted or archived; the tests
//! check exit codes, printed output and that no mount directory appears.

use std::process::{Command, Output};

use snapborg::exit_codes;
use snapborg::test_support::TestConfigDir;

fn config_body(dir: &std::path::Path) -> String {
    format!(
        r#"
repository = "/var/borg/repo.borg"
mount_base = "{mount}"

[log]
file = "{log}"

[[volumes]]
device = "/dev/ubuntu-vg/archive"
fs_type = "ext4"

[[volumes]]
device = "/dev/ubuntu-vg/ubuntu-lv"
fs_type = "ext4"
"#,
        mount = dir.join("mnt").display(),
        log = dir.join("snapborg.log").display(),
    )
}

fn snapborg(config: &TestConfigDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_snapborg"))
        .arg("--config")
        .arg(&config.config_path)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn snapborg")
}

fn scratch() -> TestConfigDir {
    let config = TestConfigDir::new("").expect("config dir");
    config
        .write_config(&config_body(config.path()))
        .expect("write config");
    config
}

#[test]
fn dry_run_backup_logs_commands_without_executing() {
    let config = scratch();
    let out = snapborg(&config, &["--dry-run", "backup"]);

    assert_eq!(out.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("lvcreate -s -l 100%FREE -n archive-jxy /dev/ubuntu-vg/archive"));
    assert!(stdout.contains("borg info --last 2 /var/borg/repo.borg"));
    assert!(stdout.contains("backup: archive={hostname}-ubuntu-lv-{now}"));
    assert!(stdout.contains("backup: report_failed=false"));
    assert!(!stdout.contains("test-passphrase"));
    assert!(!config.path().join("mnt").exists());

    let log = std::fs::read_to_string(config.path().join("snapborg.log")).expect("log file");
    assert!(log.contains("umount -f /dev/ubuntu-vg/ubuntu-lv-jxy"));
    assert!(log.contains("cmd_backup"));
}

#[test]
fn check_prints_plan() {
    let config = scratch();
    let out = snapborg(&config, &["check"]);

    assert_eq!(out.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("prune_prefix={hostname}-archive"));
    assert!(stdout.contains("snapshot=/dev/ubuntu-vg/ubuntu-lv-jxy"));
}

#[test]
fn dry_run_teardown_succeeds() {
    let config = scratch();
    let out = snapborg(&config, &["teardown", "--dry-run"]);

    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&out.stdout).contains("teardown: steps=6 failed=0"));
}

#[test]
fn overlapping_volume_names_are_invalid() {
    let config = TestConfigDir::new(
        r#"
[log]
level = "info"

[[volumes]]
device = "/dev/vg0/data"
fs_type = "ext4"

[[volumes]]
device = "/dev/vg0/data-old"
fs_type = "ext4"
"#,
    )
    .expect("config dir");
    let out = snapborg(&config, &["check"]);

    assert_eq!(out.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&out.stderr).contains("prune filters would overlap"));
}

#[test]
fn missing_passphrase_is_invalid() {
    let config = scratch();
    std::fs::remove_file(config.path().join(".borg-passphrase")).expect("remove passphrase");
    let out = snapborg(&config, &["--dry-run", "backup"]);

    assert_eq!(out.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&out.stderr).contains("passphrase"));
}
