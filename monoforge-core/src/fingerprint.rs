//! Content fingerprinting for modification detection.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::Result;

/// Directory names that never contribute to a package's content.
const DEFAULT_SKIP: &[&str] = &[".git", ".monoforge", "target", "dist", "node_modules"];

/// Computes a hex-encoded SHA-256 digest over a package directory.
///
/// The digest covers every tracked file, including the manifest, visited in
/// sorted relative-path order so the result is stable across platforms and
/// repeated calls. `ignore` extends the built-in skip list with
/// workspace-configured directory names.
pub fn fingerprint_dir(dir: &Path, ignore: &[String]) -> Result<String> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir()
                && (DEFAULT_SKIP.contains(&name.as_ref()) || ignore.iter().any(|i| i == &*name)))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();

    let mut hasher = Sha256::new();
    for file in files {
        let relative = file.strip_prefix(dir).unwrap_or(&file);
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        let content = fs::read(&file)?;
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(&content);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "pub fn f() {}").unwrap();

        let first = fingerprint_dir(dir.path(), &[]).unwrap();
        let second = fingerprint_dir(dir.path(), &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn changes_when_content_changes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let before = fingerprint_dir(dir.path(), &[]).unwrap();

        fs::write(dir.path().join("a.txt"), "goodbye").unwrap();
        let after = fingerprint_dir(dir.path(), &[]).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let before = fingerprint_dir(dir.path(), &[]).unwrap();

        fs::create_dir(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("dist/out.bin"), "artifact").unwrap();
        let after = fingerprint_dir(dir.path(), &[]).unwrap();
        assert_eq!(before, after);
    }
}
