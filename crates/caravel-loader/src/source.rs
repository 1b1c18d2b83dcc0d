//! Parsing of host module sources.
//!
//! A source file is UTF-8 text whose `export <ident>` declarations form the
//! module's exported metadata. The parser checks export names, duplicate
//! exports within a file, and brace balance; anything it flags becomes a
//! compile diagnostic.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// File extension of host module sources.
pub const SOURCE_EXTENSION: &str = "src";

/// A compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Source file.
    pub file: PathBuf,
    /// 1-based line.
    pub line: usize,
    /// Message.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}", self.file.display(), self.line, self.message)
    }
}

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    /// Source path.
    pub path: PathBuf,
    /// Raw text.
    pub text: String,
    /// Exported names, in declaration order.
    pub exports: Vec<String>,
}

/// Parse one source file's text, accumulating diagnostics.
#[must_use]
pub fn parse_source(path: &Path, text: &str) -> (ParsedSource, Vec<Diagnostic>) {
    let mut exports = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut diagnostics = Vec::new();
    let mut depth: i64 = 0;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("export ") {
            let name = rest
                .split(|c: char| c == '{' || c.is_whitespace())
                .next()
                .unwrap_or("");
            if !is_valid_ident(name) {
                diagnostics.push(Diagnostic {
                    file: path.to_path_buf(),
                    line: line_no,
                    message: format!("invalid export name '{name}'"),
                });
            } else if !seen.insert(name.to_string()) {
                diagnostics.push(Diagnostic {
                    file: path.to_path_buf(),
                    line: line_no,
                    message: format!("duplicate export '{name}'"),
                });
            } else {
                exports.push(name.to_string());
            }
        }

        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                break;
            }
        }
        if depth < 0 {
            diagnostics.push(Diagnostic {
                file: path.to_path_buf(),
                line: line_no,
                message: "unmatched '}'".to_string(),
            });
            depth = 0;
        }
    }

    if depth > 0 {
        diagnostics.push(Diagnostic {
            file: path.to_path_buf(),
            line: text.lines().count().max(1),
            message: "unclosed '{'".to_string(),
        });
    }

    (
        ParsedSource {
            path: path.to_path_buf(),
            text: text.to_string(),
            exports,
        },
        diagnostics,
    )
}

fn is_valid_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (ParsedSource, Vec<Diagnostic>) {
        parse_source(Path::new("main.src"), text)
    }

    #[test]
    fn exports_are_collected_in_order() {
        let (source, diagnostics) = parse("export Main {\n}\nexport Helper {\n}\n");
        assert!(diagnostics.is_empty());
        assert_eq!(source.exports, vec!["Main", "Helper"]);
    }

    #[test]
    fn invalid_export_name_is_a_diagnostic() {
        let (_, diagnostics) = parse("export 1bad { }\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("invalid export name"));
        assert_eq!(diagnostics[0].line, 1);
    }

    #[test]
    fn duplicate_export_is_a_diagnostic() {
        let (source, diagnostics) = parse("export A { }\nexport A { }\n");
        assert_eq!(source.exports, vec!["A"]);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("duplicate export"));
    }

    #[test]
    fn unbalanced_braces_are_diagnostics() {
        let (_, diagnostics) = parse("export A {\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("unclosed"));

        let (_, diagnostics) = parse("}\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("unmatched"));
    }

    #[test]
    fn dotted_names_are_valid() {
        let (source, diagnostics) = parse("export App.Entry { }\n");
        assert!(diagnostics.is_empty());
        assert_eq!(source.exports, vec!["App.Entry"]);
    }

    #[test]
    fn diagnostic_display_format() {
        let d = Diagnostic {
            file: PathBuf::from("main.src"),
            line: 3,
            message: "unclosed '{'".to_string(),
        };
        assert_eq!(d.to_string(), "main.src(3): unclosed '{'");
    }
}
