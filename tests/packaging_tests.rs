//! Loading extensions from disk and writing converted packages

use extension_porter::models::{Outcome, PolicyKind};
use extension_porter::packager::{self, extractor};
use extension_porter::{ConversionStatus, Converter};
use pretty_assertions::assert_eq;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::TempDir;
use zip::write::{FileOptions, ZipWriter};
use zip::ZipArchive;

fn write(dir: &Path, path: &str, content: &str) {
    let path = dir.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_extension(dir: &Path) {
    write(
        dir,
        "manifest.json",
        r#"{
            // Chrome tolerates comments here
            "manifest_version": 3,
            "name": "__MSG_appName__",
            "version": "2.3.1",
            "description": "Counts tabs",
            "default_locale": "en",
            "permissions": ["tabs", "storage"],
            "background": {"service_worker": "js/background.js"},
            "action": {"default_popup": "popup/popup.html"},
            "icons": {"48": "icons/48.png"}
        }"#,
    );
    write(dir, "_locales/en/messages.json", r#"{"appName": {"message": "Tab Counter"}}"#);
    write(dir, "js/background.js", "const url = chrome.extension.getURL('popup/popup.html');\n");
    write(dir, "popup/popup.html", r#"<html><body><script src="popup.js"></script></body></html>"#);
    write(dir, "popup/popup.js", "chrome.tabs.query({}, (tabs) => show(tabs.length));\n");
    write(dir, "icons/48.png", "not really a png");
}

#[test]
fn test_directory_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("chrome");
    sample_extension(&input);

    let extension = packager::load_extension(&input).unwrap();
    let conversion_input = extension.conversion_input().unwrap();
    assert_eq!(conversion_input.scripts.len(), 2);

    let result = Converter::with_defaults().unwrap().convert(&conversion_input).unwrap();
    assert_eq!(result.status(), ConversionStatus::Convertible);
    assert_eq!(result.report.extension_name(), "Tab Counter");

    let output = temp_dir.path().join("firefox");
    let written = packager::write_package(&extension, &result, &output).unwrap();

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["background"]["scripts"][0], "js/background.js");
    assert_eq!(manifest["browser_specific_settings"]["gecko"]["id"], "tab-counter@converted-extension.org");

    assert_eq!(
        fs::read_to_string(output.join("js/background.js")).unwrap(),
        "const url = chrome.runtime.getURL('popup/popup.html');\n"
    );
    assert_eq!(
        fs::read_to_string(output.join("popup/popup.js")).unwrap(),
        "chrome.tabs.query({}, (tabs) => show(tabs.length));\n"
    );
    assert!(output.join("_locales/en/messages.json").is_file());
    assert!(output.join("package.json").is_file());

    let mut archive = ZipArchive::new(fs::File::open(&written.xpi).unwrap()).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "_locales/en/messages.json",
            "icons/48.png",
            "js/background.js",
            "manifest.json",
            "package.json",
            "popup/popup.html",
            "popup/popup.js",
        ]
    );

    let mut packaged_manifest = String::new();
    archive
        .by_name("manifest.json")
        .unwrap()
        .read_to_string(&mut packaged_manifest)
        .unwrap();
    assert_eq!(packaged_manifest, result.manifest.unwrap().to_json_pretty().unwrap());
}

#[test]
fn test_zip_input() {
    let temp_dir = TempDir::new().unwrap();
    let archive_path = temp_dir.path().join("ext.zip");

    let mut zip = ZipWriter::new(fs::File::create(&archive_path).unwrap());
    zip.start_file("manifest.json", FileOptions::default()).unwrap();
    zip.write_all(br#"{"manifest_version": 2, "name": "Zipped", "version": "1", "background": {"scripts": ["bg.js"]}}"#)
        .unwrap();
    zip.start_file("bg.js", FileOptions::default()).unwrap();
    zip.write_all(b"chrome.tabGroups.query({});").unwrap();
    zip.finish().unwrap();

    let extension = packager::load_extension(&archive_path).unwrap();
    let input = extension.conversion_input().unwrap();
    let result = Converter::with_defaults().unwrap().convert(&input).unwrap();

    assert_eq!(result.status(), ConversionStatus::ConvertibleWithWarnings);
    assert_eq!(result.scanned_scripts.len(), 1);
}

#[test]
fn test_unsupported_input_format() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("extension.tar");
    fs::write(&path, "x").unwrap();
    assert!(packager::load_extension(&path).is_err());
    assert!(extractor::load_from_archive(&temp_dir.path().join("missing.zip")).is_err());
}

#[test]
fn test_non_utf8_script_keeps_its_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("latin1");
    write(
        &input,
        "manifest.json",
        r#"{"manifest_version": 2, "name": "Latin", "version": "1", "background": {"scripts": ["bg.js"]}}"#,
    );
    let original: &[u8] = b"var s = '\xe9t\xe9'; chrome.extension.getURL('a');\n";
    fs::write(input.join("bg.js"), original).unwrap();

    let extension = packager::load_extension(&input).unwrap();
    let conversion_input = extension.conversion_input().unwrap();
    assert!(conversion_input.scripts[0].lossy);

    let result = Converter::with_defaults().unwrap().convert(&conversion_input).unwrap();
    assert!(result.rewritten_scripts.is_empty());

    let verdict = result
        .report
        .verdicts()
        .iter()
        .find(|v| v.subject == "chrome.extension.getURL")
        .unwrap();
    assert_eq!(verdict.policy, Some(PolicyKind::Rename));
    assert_eq!(verdict.outcome, Outcome::ManualReview);

    let output = temp_dir.path().join("out");
    packager::write_package(&extension, &result, &output).unwrap();
    assert_eq!(fs::read(output.join("bg.js")).unwrap(), original);
}
