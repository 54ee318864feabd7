//! Command-line behavior: stdout carries only command output, logs and
//! errors go to stderr.

use std::path::Path;
use std::process::{Command, Output};

fn write_config(dir: &Path, base_url: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let cache_dir = dir.join("cache").display().to_string();
    std::fs::write(
        &path,
        format!(
            "units = \"c\"\n\n[cache]\ndir = {:?}\nttl_secs = 3600\n\n[endpoint]\nbase_url = {:?}\ntimeout_secs = 2\n",
            cache_dir, base_url
        ),
    )
    .unwrap();
    path
}

fn skyquery(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_skyquery"))
        .env("RUST_LOG", "info")
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_condition_prints_only_text_on_stdout() {
    let dir = tempfile::tempdir().unwrap();
    // Missing config file: defaults are written and logged at info.
    let config = dir.path().join("fresh.toml");

    let output = skyquery(&config, &["condition", "26"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "cloudy\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Wrote default configuration"));
}

#[test]
fn test_cache_prune_logs_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:1/v1/public/yql");

    let output = skyquery(&config, &["cache", "prune"]);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Removed 0 cache entries\n"
    );
    assert!(String::from_utf8_lossy(&output.stderr).contains("Purged 0 expired cache records"));
    assert!(dir.path().join("cache").is_dir());
}

#[test]
fn test_unknown_condition_code_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:1/v1/public/yql");

    let output = skyquery(&config, &["condition", "999"]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown condition code: 999"));
    // Translating a code never touches the cache.
    assert!(!dir.path().join("cache").exists());
}

#[test]
fn test_unreachable_service_reports_user_message() {
    let dir = tempfile::tempdir().unwrap();
    // Nothing listens on port 1, so the connection is refused.
    let config = write_config(dir.path(), "http://127.0.0.1:1/v1/public/yql");

    let output = skyquery(&config, &["wind", "2487956"]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr)
        .contains("Weather service unavailable. Please try again later."));
}
