//! Extension extraction from archives and directories

use super::LoadedExtension;
use crate::analyzer::identity::{extension_id_from_public_key, is_extension_id};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::ZipArchive;

const CRX_MAGIC: &[u8] = b"Cr24";

/// Load extension from directory.
///
/// Accepts an unpacked extension or a Chrome profile folder
/// (`Extensions/<id>`), in which case the newest `<version>` inside it is
/// used and `<id>` becomes the extension id hint.
pub fn load_from_directory(dir: &Path) -> Result<LoadedExtension> {
    let root = resolve_root(dir)?;
    let mut files = BTreeMap::new();

    for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            let path = entry.path();
            let relative_path = path.strip_prefix(&root).context("Failed to get relative path")?;

            let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

            files.insert(relative_path.to_path_buf(), content);
        }
    }

    let extension_id_hint = [root.as_path(), dir]
        .into_iter()
        .chain(root.parent())
        .filter_map(|p| p.file_name()?.to_str())
        .find(|name| is_extension_id(name))
        .map(str::to_string);

    debug!("Loaded {} files from {}", files.len(), root.display());
    Ok(LoadedExtension {
        files,
        extension_id_hint,
    })
}

fn resolve_root(dir: &Path) -> Result<PathBuf> {
    if dir.join("manifest.json").is_file() {
        return Ok(dir.to_path_buf());
    }

    let mut versions: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.join("manifest.json").is_file())
        .collect();
    versions.sort_by_key(|p| version_key(p));

    versions
        .pop()
        .ok_or_else(|| anyhow::anyhow!("manifest.json not found in {}", dir.display()))
}

/// Numeric components of a profile version folder such as `1.10.2_0`
fn version_key(path: &Path) -> Vec<u64> {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|part| part.parse().ok())
        .collect()
}

/// Load extension from ZIP or CRX archive
pub fn load_from_archive(archive_path: &Path) -> Result<LoadedExtension> {
    let bytes = fs::read(archive_path)
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;
    load_from_bytes(&bytes)
}

/// Load extension from ZIP or CRX bytes
pub fn load_from_bytes(bytes: &[u8]) -> Result<LoadedExtension> {
    let (zip_bytes, extension_id_hint) = strip_crx_header(bytes)?;

    let mut archive = ZipArchive::new(Cursor::new(zip_bytes)).context("Failed to read ZIP archive")?;

    let mut entries = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).context("Failed to read file from archive")?;

        if file.is_file() {
            let Some(path) = file.enclosed_name().map(Path::to_path_buf) else {
                debug!("Skipping unsafe archive path {}", file.name());
                continue;
            };
            let mut content = Vec::new();
            file.read_to_end(&mut content).context("Failed to read file content")?;
            entries.insert(path, content);
        }
    }

    // Some archives wrap the extension in a top-level folder
    let prefix = entries
        .keys()
        .filter(|p| p.file_name().and_then(|n| n.to_str()) == Some("manifest.json"))
        .min_by_key(|p| p.components().count())
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("manifest.json not found in archive"))?;

    let files = entries
        .into_iter()
        .filter_map(|(path, content)| {
            let relative = path.strip_prefix(&prefix).ok()?.to_path_buf();
            Some((relative, content))
        })
        .collect();

    Ok(LoadedExtension {
        files,
        extension_id_hint,
    })
}

/// Skip a CRX header, returning the embedded ZIP. CRX2 headers carry the
/// public key, from which the extension id follows.
fn strip_crx_header(bytes: &[u8]) -> Result<(&[u8], Option<String>)> {
    if !bytes.starts_with(CRX_MAGIC) {
        return Ok((bytes, None));
    }

    let word = |offset: usize| -> Result<usize> {
        let slice = bytes
            .get(offset..offset + 4)
            .ok_or_else(|| anyhow::anyhow!("Truncated CRX header"))?;
        Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]) as usize)
    };

    match word(4)? {
        2 => {
            let key_len = word(8)?;
            let signature_len = word(12)?;
            let key = bytes
                .get(16..16 + key_len)
                .ok_or_else(|| anyhow::anyhow!("Truncated CRX2 public key"))?;
            let start = 16 + key_len + signature_len;
            let zip = bytes.get(start..).ok_or_else(|| anyhow::anyhow!("Truncated CRX2 archive"))?;
            Ok((zip, Some(extension_id_from_public_key(key))))
        }
        3 => {
            let start = 12 + word(8)?;
            let zip = bytes.get(start..).ok_or_else(|| anyhow::anyhow!("Truncated CRX3 archive"))?;
            Ok((zip, None))
        }
        other => anyhow::bail!("Unsupported CRX version {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{FileOptions, ZipWriter};

    const MANIFEST: &str = r#"{
        "manifest_version": 3,
        "name": "Test",
        "version": "1.0"
    }"#;

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_load_from_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("manifest.json"), MANIFEST).unwrap();
        fs::write(temp_dir.path().join("background.js"), "console.log('test');").unwrap();

        let extension = load_from_directory(temp_dir.path()).unwrap();
        assert_eq!(extension.files.len(), 2);
        assert!(extension.extension_id_hint.is_none());
    }

    #[test]
    fn test_profile_folder_uses_newest_version() {
        let temp_dir = TempDir::new().unwrap();
        let id_dir = temp_dir.path().join("abcdefghijklmnopabcdefghijklmnop");
        for version in ["1.9_0", "1.10_0"] {
            fs::create_dir_all(id_dir.join(version)).unwrap();
            fs::write(id_dir.join(version).join("manifest.json"), MANIFEST).unwrap();
            fs::write(id_dir.join(version).join(format!("{}.txt", version)), version).unwrap();
        }

        let extension = load_from_directory(&id_dir).unwrap();
        assert!(extension.files.contains_key(Path::new("1.10_0.txt")));
        assert_eq!(
            extension.extension_id_hint.as_deref(),
            Some("abcdefghijklmnopabcdefghijklmnop")
        );
    }

    #[test]
    fn test_archive_with_wrapper_folder() {
        let bytes = zip_bytes(&[
            ("ext/manifest.json", MANIFEST),
            ("ext/js/bg.js", "chrome.runtime.id;"),
        ]);

        let extension = load_from_bytes(&bytes).unwrap();
        assert!(extension.files.contains_key(Path::new("manifest.json")));
        assert!(extension.files.contains_key(Path::new("js/bg.js")));
    }

    #[test]
    fn test_crx3_header_is_skipped() {
        let zip = zip_bytes(&[("manifest.json", MANIFEST)]);
        let header = [0u8; 6];
        let mut crx = Vec::new();
        crx.extend_from_slice(CRX_MAGIC);
        crx.extend_from_slice(&3u32.to_le_bytes());
        crx.extend_from_slice(&(header.len() as u32).to_le_bytes());
        crx.extend_from_slice(&header);
        crx.extend_from_slice(&zip);

        let extension = load_from_bytes(&crx).unwrap();
        assert_eq!(extension.files.len(), 1);
    }

    #[test]
    fn test_crx2_header_yields_id() {
        let zip = zip_bytes(&[("manifest.json", MANIFEST)]);
        let key = b"not really a DER key";
        let mut crx = Vec::new();
        crx.extend_from_slice(CRX_MAGIC);
        crx.extend_from_slice(&2u32.to_le_bytes());
        crx.extend_from_slice(&(key.len() as u32).to_le_bytes());
        crx.extend_from_slice(&4u32.to_le_bytes());
        crx.extend_from_slice(key);
        crx.extend_from_slice(b"sig!");
        crx.extend_from_slice(&zip);

        let extension = load_from_bytes(&crx).unwrap();
        let hint = extension.extension_id_hint.unwrap();
        assert!(is_extension_id(&hint));
    }

    #[test]
    fn test_archive_without_manifest() {
        let bytes = zip_bytes(&[("readme.txt", "hello")]);
        assert!(load_from_bytes(&bytes).is_err());
    }
}
