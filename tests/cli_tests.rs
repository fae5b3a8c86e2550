//! Command-line behaviour of the `extension-porter` binary

use pretty_assertions::assert_eq;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn porter() -> Command {
    Command::new(env!("CARGO_BIN_EXE_extension-porter"))
}

#[test]
fn test_convert_json_output_is_a_single_document() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("ext");
    fs::create_dir_all(&input).unwrap();
    fs::write(
        input.join("manifest.json"),
        r#"{"manifest_version": 3, "name": "Json Mode", "version": "1.0",
            "background": {"service_worker": "bg.js"}}"#,
    )
    .unwrap();
    fs::write(input.join("bg.js"), "chrome.extension.getURL('a');\n").unwrap();
    let output = temp_dir.path().join("out");

    let run = porter()
        .args(["convert", "--json", "--report", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .output()
        .unwrap();

    assert!(run.status.success());
    let document: serde_json::Value = serde_json::from_slice(&run.stdout).unwrap();
    assert_eq!(document["manifest"]["name"], "Json Mode");
    assert!(output.with_extension("xpi").is_file());
    assert!(output.with_extension("md").is_file());
}

#[test]
fn test_rules_lists_restructure_transforms() {
    let run = porter().args(["rules", "--policy", "restructure"]).output().unwrap();

    assert!(run.status.success());
    let stdout = String::from_utf8(run.stdout).unwrap();
    assert!(stdout.contains("Restructure transforms:"));
    assert!(stdout.contains("  - service_worker_to_scripts"));
}
