//! The compilation backend seam.
//!
//! The project compiler orchestrates parsing, reference resolution, and
//! caching; the backend turns a prepared compile unit into a binary image.
//! The in-tree [`ImageBackend`] emits a deterministic module image — magic
//! header, identity, export table, reference list, source digest — plus a
//! debug-symbol sidecar mapping the image back to its sources.

use crate::compiler::ReferenceImage;
use crate::source::{Diagnostic, ParsedSource};
use caravel_core::Version;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::PathBuf;

/// A resolved reference handed to the backend.
#[derive(Debug, Clone)]
pub enum Reference {
    /// An already-compiled in-memory module image.
    Image(ReferenceImage),
    /// A module loaded by the runtime from disk.
    Path {
        /// Reference name.
        name: String,
        /// On-disk location.
        path: PathBuf,
    },
    /// A name-only framework reference.
    Name {
        /// Reference name.
        name: String,
        /// Version from the framework profile.
        version: Version,
    },
}

impl Reference {
    /// The reference's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Image(image) => &image.name,
            Self::Path { name, .. } | Self::Name { name, .. } => name,
        }
    }
}

/// Everything a backend needs for one compilation.
#[derive(Debug)]
pub struct CompileUnit {
    /// Assembly name.
    pub name: String,
    /// Assembly version.
    pub version: Version,
    /// Build configuration name (e.g. `Debug`).
    pub configuration: String,
    /// Manifest `compilationOptions`, serialised to compact JSON.
    pub options: Option<String>,
    /// Parsed sources, in path order.
    pub sources: Vec<ParsedSource>,
    /// Resolved references, dependency order then framework baseline.
    pub references: Vec<Reference>,
}

/// A finished compilation.
#[derive(Debug)]
pub struct CompiledOutput {
    /// The binary module image.
    pub image: Vec<u8>,
    /// Debug symbols.
    pub symbols: Vec<u8>,
}

/// Turns a compile unit into a binary image.
pub trait CompileBackend: Send + Sync {
    /// Compile the unit, or report the diagnostics that prevented it.
    ///
    /// # Errors
    /// Returns the collected diagnostics on failure.
    fn compile(&self, unit: &CompileUnit) -> std::result::Result<CompiledOutput, Vec<Diagnostic>>;
}

/// Magic prefix of module images.
const IMAGE_MAGIC: &[u8; 4] = b"CVLB";

/// Magic prefix of symbol sidecars.
const SYMBOLS_MAGIC: &[u8; 4] = b"CVLS";

/// The deterministic in-tree backend.
#[derive(Debug, Default)]
pub struct ImageBackend;

impl CompileBackend for ImageBackend {
    fn compile(&self, unit: &CompileUnit) -> std::result::Result<CompiledOutput, Vec<Diagnostic>> {
        let mut digest = Sha256::new();
        for source in &unit.sources {
            digest.update(source.text.as_bytes());
        }
        let source_digest = digest.finalize();

        let mut image = Vec::new();
        image.extend_from_slice(IMAGE_MAGIC);
        push_str(&mut image, &unit.name);
        push_str(&mut image, &unit.version.to_string());
        push_str(&mut image, &unit.configuration);
        push_str(&mut image, unit.options.as_deref().unwrap_or(""));

        let exports: Vec<&str> = unit
            .sources
            .iter()
            .flat_map(|s| s.exports.iter().map(String::as_str))
            .collect();
        push_list(&mut image, &exports);

        let references: Vec<String> = unit
            .references
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        let reference_strs: Vec<&str> = references.iter().map(String::as_str).collect();
        push_list(&mut image, &reference_strs);
        image.extend_from_slice(&source_digest);

        let mut symbols = Vec::new();
        symbols.extend_from_slice(SYMBOLS_MAGIC);
        let mut table = String::new();
        for source in &unit.sources {
            let mut digest = Sha256::new();
            digest.update(source.text.as_bytes());
            let _ = writeln!(
                table,
                "{} {:x}",
                source.path.display(),
                digest.finalize()
            );
        }
        symbols.extend_from_slice(table.as_bytes());

        Ok(CompiledOutput { image, symbols })
    }
}

fn push_str(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    buf.extend_from_slice(&(u32::try_from(bytes.len()).unwrap_or(u32::MAX)).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn push_list(buf: &mut Vec<u8>, items: &[&str]) {
    buf.extend_from_slice(&(u32::try_from(items.len()).unwrap_or(u32::MAX)).to_le_bytes());
    for item in items {
        push_str(buf, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_source;
    use std::path::Path;

    fn unit(sources: &[(&str, &str)]) -> CompileUnit {
        CompileUnit {
            name: "App".to_string(),
            version: Version::parse("1.0").unwrap(),
            configuration: "Debug".to_string(),
            options: None,
            sources: sources
                .iter()
                .map(|(path, text)| parse_source(Path::new(path), text).0)
                .collect(),
            references: vec![Reference::Name {
                name: "System".to_string(),
                version: Version::parse("4.5").unwrap(),
            }],
        }
    }

    #[test]
    fn image_is_deterministic() {
        let backend = ImageBackend;
        let a = backend.compile(&unit(&[("m.src", "export A { }")])).unwrap();
        let b = backend.compile(&unit(&[("m.src", "export A { }")])).unwrap();
        assert_eq!(a.image, b.image);
        assert_eq!(a.symbols, b.symbols);
    }

    #[test]
    fn image_changes_with_sources() {
        let backend = ImageBackend;
        let a = backend.compile(&unit(&[("m.src", "export A { }")])).unwrap();
        let b = backend.compile(&unit(&[("m.src", "export B { }")])).unwrap();
        assert_ne!(a.image, b.image);
    }

    #[test]
    fn options_affect_the_image() {
        let backend = ImageBackend;
        let plain = backend.compile(&unit(&[("m.src", "export A { }")])).unwrap();

        let mut with_options = unit(&[("m.src", "export A { }")]);
        with_options.options = Some(r#"{"define":["RELEASE"]}"#.to_string());
        let optioned = backend.compile(&with_options).unwrap();
        assert_ne!(plain.image, optioned.image);
    }

    #[test]
    fn image_carries_magic() {
        let backend = ImageBackend;
        let out = backend.compile(&unit(&[("m.src", "export A { }")])).unwrap();
        assert_eq!(&out.image[..4], b"CVLB");
        assert_eq!(&out.symbols[..4], b"CVLS");
    }
}
