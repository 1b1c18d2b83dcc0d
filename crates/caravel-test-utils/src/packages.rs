//! Package archive builders and store seeding.

use caravel_core::Version;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Build a package zip in memory: the given `package.json` metadata plus
/// any extra entries.
#[must_use]
pub fn package_archive(metadata: &str, extra_entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut buf);
        writer
            .start_file("package.json", SimpleFileOptions::default())
            .expect("start metadata entry");
        writer
            .write_all(metadata.as_bytes())
            .expect("write metadata");
        for (name, contents) in extra_entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start entry");
            writer.write_all(contents).expect("write entry");
        }
        writer.finish().expect("finish archive");
    }
    buf.into_inner()
}

/// Seed a fully-installed package into a store root: the extracted tree
/// plus the original archive, exactly as an install would leave it.
pub fn seed_store_package(store_root: &Path, name: &str, version: &str, metadata: &str) {
    let version = Version::parse(version).expect("valid version");
    let dir = store_root.join(name).join(version.to_string());
    fs::create_dir_all(&dir).expect("create package dir");
    fs::write(dir.join("package.json"), metadata).expect("write metadata");

    let archive = package_archive(metadata, &[]);
    fs::write(dir.join(format!("{name}.{version}.zip")), archive).expect("write archive");
}
