//! Integration tests for the command-line interface.
//!
//! Runs the built binary against temporary ROM libraries.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Helper to create a library with a `psx` folder and an empty target.
fn setup_library() -> TempDir {
    let dir = TempDir::new().unwrap();
    let psx = dir.path().join("roms/psx");
    fs::create_dir_all(psx.join("images")).unwrap();
    fs::write(psx.join("game1.bin"), "rom").unwrap();
    fs::write(psx.join("images/game1.png"), "png").unwrap();
    fs::write(
        psx.join("gameslist.xml"),
        "<image>../psx/images/game1.png</image>",
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("sd")).unwrap();
    dir
}

fn command(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rom-copy-engine"));
    cmd.arg("--sourceDir")
        .arg(dir.join("roms"))
        .arg("--targetDir")
        .arg(dir.join("sd"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to run rom-copy-engine")
}

#[test]
fn test_copy_explode_rename_rewrite() {
    let dir = setup_library();
    let output = run(command(dir.path()).args([
        "--mapping",
        "psx:PS1",
        "--explodeDir",
        "images",
        "--rename",
        "gameslist.xml:miyoogamelist.xml",
        "--rewrite",
        "*.xml:../psx/images/:./",
        "--skipConfirm",
    ]));

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Summary:"));
    assert!(stdout.contains("completed successfully"));

    let ps1 = dir.path().join("sd/PS1");
    assert_eq!(fs::read_to_string(ps1.join("game1.bin")).unwrap(), "rom");
    assert!(ps1.join("game1.png").is_file());
    assert!(!ps1.join("images").exists());
    assert_eq!(
        fs::read_to_string(ps1.join("miyoogamelist.xml")).unwrap(),
        "<image>./game1.png</image>"
    );
}

#[test]
fn test_dry_run_touches_nothing() {
    let dir = setup_library();
    let output = run(command(dir.path()).args(["--mapping", "psx:PS1", "--dryRun"]));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[DRY RUN]"));
    assert!(stdout.contains("would be copied"));
    assert!(!dir.path().join("sd/PS1").exists());
}

#[test]
fn test_malformed_mapping_is_rejected() {
    let dir = setup_library();
    let output = run(command(dir.path()).args(["--mapping", "psx", "-y"]));

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("source:destination"));
}

#[test]
fn test_missing_source_folder_fails_before_copying() {
    let dir = setup_library();
    let output = run(command(dir.path()).args(["--mapping", "gba:GBA", "-y"]));

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"));
    assert!(!dir.path().join("sd/GBA").exists());
}

#[test]
fn test_declining_prompt_cancels() {
    let dir = setup_library();
    let mut child = command(dir.path())
        .args(["--mapping", "psx:PS1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"n\n").unwrap();
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Copy cancelled"));
    assert!(!dir.path().join("sd/PS1").exists());
}

#[test]
fn test_accepting_prompt_copies() {
    let dir = setup_library();
    let mut child = command(dir.path())
        .args(["--mapping", "psx:PS1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"y\n").unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert!(dir.path().join("sd/PS1/game1.bin").is_file());
}

#[test]
fn test_json_output_is_one_event_per_line() {
    let dir = setup_library();
    let output = run(command(dir.path()).args(["--mapping", "psx:PS1", "-y", "--output", "json"]));

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(events.first().unwrap()["event"], "mapping_started");
    assert_eq!(events.last().unwrap()["event"], "mapping_completed");
    let copied = events
        .iter()
        .filter(|e| e["event"] == "file_copied")
        .count();
    assert_eq!(copied, 3);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Summary:"));
}

#[test]
fn test_profile_file_with_flag_overrides() {
    let dir = setup_library();
    let profile = dir.path().join("profile.toml");
    fs::write(
        &profile,
        r#"
copy_include = ["**/*.bin"]

[[mappings]]
source = "psx"
destination = "PS1"
"#,
    )
    .unwrap();

    let output = run(command(dir.path())
        .arg("--config")
        .arg(&profile)
        .args(["--copyInclude", "**/*.png", "-y"]));

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let ps1 = dir.path().join("sd/PS1");
    assert!(ps1.join("game1.bin").is_file());
    assert!(ps1.join("images/game1.png").is_file());
    assert!(!ps1.join("gameslist.xml").exists());
}
