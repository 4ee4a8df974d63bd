//! Integration tests for `bundlelink build --json` output.

use std::process::Command;
use tempfile::tempdir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "bundlelink-cli", "--bin", "bundlelink", "--"]);
    cmd
}

#[test]
fn test_build_json_emits_valid_single_object() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("entry.js"), "console.log('hi');\n").unwrap();

    let output = cargo_bin()
        .args(["build", "--json", "--outdir"])
        .arg(dir.path().join("out"))
        .arg("--cwd")
        .arg(dir.path())
        .arg("entry.js")
        .output()
        .expect("failed to run build command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim_end();

    assert!(trimmed.starts_with('{'), "expected JSON object, got: {trimmed}");
    let json: serde_json::Value = serde_json::from_str(trimmed).expect("output should be valid JSON");
    assert!(json.is_object());
    assert!(json.get("ok").is_some(), "ok field should be present");
    assert!(json.get("chunks").is_some(), "chunks field should be present");
    assert!(json.get("duration_ms").is_some(), "duration_ms field should be present");
}

#[test]
fn test_build_succeeds_and_writes_metafile() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("entry.js"), "export const x = 1;\n").unwrap();
    let outdir = dir.path().join("out");

    let output = cargo_bin()
        .args(["build", "--json", "--outdir"])
        .arg(&outdir)
        .arg("--cwd")
        .arg(dir.path())
        .arg("entry.js")
        .output()
        .expect("failed to run build command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim_end()).expect("valid JSON");
    assert_eq!(json["ok"], true, "build should succeed: {stdout}");
    assert!(outdir.join("metafile.json").exists(), "metafile.json should be written");
}

#[test]
fn test_build_missing_entry_reports_error_and_exits_nonzero() {
    let dir = tempdir().unwrap();

    let output = cargo_bin()
        .args(["build", "--json", "--outdir"])
        .arg(dir.path().join("out"))
        .arg("--cwd")
        .arg(dir.path())
        .arg("missing.js")
        .output()
        .expect("failed to run build command");

    assert!(!output.status.success(), "build should fail for a missing entry point");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim_end()).expect("valid JSON even on failure");
    assert_eq!(json["ok"], false);
    let diagnostics = json["diagnostics"].as_array().expect("diagnostics array present");
    assert!(!diagnostics.is_empty(), "diagnostics should report why the build failed");
}

#[test]
fn test_build_human_output_is_not_json() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("entry.js"), "console.log('hi');\n").unwrap();

    let output = cargo_bin()
        .args(["build", "--outdir"])
        .arg(dir.path().join("out"))
        .arg("--cwd")
        .arg(dir.path())
        .arg("entry.js")
        .output()
        .expect("failed to run build command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("built"), "human output should describe the build: {stdout}");
    assert!(!stdout.trim_start().starts_with('{'), "human output should not be JSON");
}

#[test]
fn test_build_writes_css_url_assets_to_outdir() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("entry.js"), "import './main.css';\n").unwrap();
    std::fs::write(dir.path().join("main.css"), ".bg { background: url(\"./logo.png\"); }\n").unwrap();
    std::fs::write(dir.path().join("logo.png"), "fake-png-bytes").unwrap();
    let outdir = dir.path().join("out");

    let output = cargo_bin()
        .args(["build", "--json", "--outdir"])
        .arg(&outdir)
        .arg("--cwd")
        .arg(dir.path())
        .arg("entry.js")
        .output()
        .expect("failed to run build command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim_end()).expect("valid JSON");
    assert_eq!(json["ok"], true, "build should succeed: {stdout}");

    let assets = json["assets"].as_array().expect("assets array present");
    assert_eq!(assets.len(), 1, "logo.png should be emitted as an asset");
    let asset_path = assets[0]["path"].as_str().unwrap();
    assert!(outdir.join(asset_path).exists(), "emitted asset should be written to disk");
}

#[test]
fn test_build_unknown_format_is_an_argument_error() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("entry.js"), "console.log('hi');\n").unwrap();

    let output = cargo_bin()
        .args(["build", "--format", "nope", "--cwd"])
        .arg(dir.path())
        .arg("entry.js")
        .output()
        .expect("failed to run build command");

    assert_eq!(output.status.code(), Some(2), "unknown format should exit with code 2");
}
