//! CLI tests for `patchbot list` and `patchbot init`.
//!
//! Spawns the binary against a fixture issue page; nothing touches the network.

use std::path::PathBuf;
use std::process::Command;

use patchbot::io::config::{BotConfig, load_config};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn list_prints_repos_in_page_order() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = Command::new(env!("CARGO_BIN_EXE_patchbot"))
        .current_dir(temp.path())
        .arg("list")
        .arg("--page")
        .arg(fixture("issue.html"))
        .output()
        .expect("patchbot list");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec!["alice/dracula-theme", "bob/nord", "carol/solarized"]
    );
}

#[test]
fn list_without_page_or_issue_url_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = Command::new(env!("CARGO_BIN_EXE_patchbot"))
        .current_dir(temp.path())
        .arg("list")
        .output()
        .expect("patchbot list");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no issue page"), "{stderr}");
}

#[test]
fn init_writes_default_config_once() {
    let temp = tempfile::tempdir().expect("tempdir");
    let run_init = |force: bool| {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_patchbot"));
        cmd.current_dir(temp.path()).arg("init");
        if force {
            cmd.arg("--force");
        }
        cmd.status().expect("patchbot init")
    };

    assert!(run_init(false).success());
    let cfg = load_config(&temp.path().join("patchbot.toml")).expect("load");
    assert_eq!(cfg, BotConfig::default());

    assert_eq!(run_init(false).code(), Some(1));
    assert!(run_init(true).success());
}
