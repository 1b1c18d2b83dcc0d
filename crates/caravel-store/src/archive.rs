//! Zip extraction for package archives.

use crate::error::{Result, StoreError};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{trace, warn};
use zip::ZipArchive;

/// Extract a zip archive into `dest`, returning the number of files written.
///
/// Entries whose names escape `dest` (absolute paths, `..` components) are
/// skipped with a warning.
///
/// # Errors
/// Returns error if the archive is unreadable or a file cannot be written.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path).map_err(|e| StoreError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| StoreError::Archive(format!("{}: {e}", archive_path.display())))?;

    let mut written = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| StoreError::Archive(format!("{}: {e}", archive_path.display())))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!(name = entry.name(), "skipping archive entry with unsafe path");
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| StoreError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| StoreError::io(&out_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| StoreError::io(&out_path, e))?;
        trace!(path = %out_path.display(), "extracted");
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn build_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_nested_entries() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("pkg.zip");
        build_zip(
            &archive,
            &[("package.json", "{}"), ("lib/net1/A.dll", "bytes")],
        );

        let dest = tmp.path().join("out");
        let count = extract_zip(&archive, &dest).unwrap();
        assert_eq!(count, 2);
        assert!(dest.join("package.json").is_file());
        assert!(dest.join("lib/net1/A.dll").is_file());
    }

    #[test]
    fn traversal_entries_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("evil.zip");
        build_zip(&archive, &[("../escape.txt", "nope"), ("ok.txt", "yes")]);

        let dest = tmp.path().join("out");
        let count = extract_zip(&archive, &dest).unwrap();
        assert_eq!(count, 1);
        assert!(dest.join("ok.txt").is_file());
        assert!(!tmp.path().join("escape.txt").exists());
    }

    #[test]
    fn unreadable_archive_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("not-a-zip.zip");
        std::fs::write(&archive, "plain text").unwrap();
        assert!(extract_zip(&archive, &tmp.path().join("out")).is_err());
    }
}
