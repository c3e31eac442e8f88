//! Document discovery and parsing.
//!
//! A specification directory contains one YAML document per entity. The loader
//! scans the directory recursively, parses every document, and records its
//! declared kind. Classification problems (an unknown or missing `type`) are
//! *not* errors here: the resolver skips those documents with a warning. The
//! only fatal conditions are an empty source directory and a document that
//! fails to parse as structured text.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use walkdir::WalkDir;

use crate::diagnostics::{to_error_source, SourceArc, Span};
use crate::{err_msg, err_src, ForgeError};

/// Declared kind of a specification document, read from its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Suite,
    Test,
    Fixture,
    PerformanceTest,
    /// Missing or unrecognized `type`; skipped by the resolver with a warning.
    Unknown,
}

impl DocumentKind {
    fn from_declared(declared: Option<&str>) -> Self {
        match declared {
            Some("suite") => DocumentKind::Suite,
            Some("test") => DocumentKind::Test,
            Some("fixture") => DocumentKind::Fixture,
            Some("performance-test") => DocumentKind::PerformanceTest,
            _ => DocumentKind::Unknown,
        }
    }
}

/// Raw parsed form of one specification file. Ephemeral: discarded once the
/// resolver has built an entity from it.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub path: PathBuf,
    pub kind: DocumentKind,
    /// The authored configuration tree, as parsed.
    pub raw: Mapping,
    /// Source handle kept for diagnostics.
    pub source: SourceArc,
}

/// Recursively scans `root` for specification documents and parses each one.
///
/// The file list is sorted so graph construction and code generation are
/// deterministic across runs. Returns a fatal error when no documents exist
/// or any document is not valid YAML.
pub fn load_documents(root: impl AsRef<Path>) -> Result<Vec<Document>, ForgeError> {
    let root = root.as_ref();
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            err_msg!(
                Validation,
                "failed to walk specification directory '{}': {}",
                root.display(),
                e
            )
        })?;
        if entry.file_type().is_file() && is_spec_file(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(err_msg!(
            Validation,
            "no specification documents found under '{}'",
            root.display()
        )
        .with_help("documents are YAML files with a `type` field (suite, test, fixture, performance-test)"));
    }

    files.into_iter().map(|path| load_document(&path)).collect()
}

fn load_document(path: &Path) -> Result<Document, ForgeError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        err_msg!(Validation, "failed to read document '{}': {}", path.display(), e)
    })?;
    parse_document(path, &text)
}

/// Parses one document from already-read text. A parse failure or a
/// non-mapping top level is fatal, with a span-labeled diagnostic.
pub fn parse_document(path: &Path, text: &str) -> Result<Document, ForgeError> {
    let source = to_error_source(path.display().to_string(), text);

    let value: Value = serde_yaml::from_str(text).map_err(|e| {
        let offset = e
            .location()
            .map(|loc| loc.index())
            .unwrap_or(0)
            .min(text.len());
        err_src!(
            Parse,
            format!("document '{}' is not valid YAML: {}", path.display(), e),
            &source,
            Span {
                start: offset,
                end: offset
            }
        )
    })?;

    let Value::Mapping(raw) = value else {
        return Err(err_src!(
            Parse,
            format!(
                "document '{}' must be a mapping at the top level",
                path.display()
            ),
            &source,
            Span { start: 0, end: text.len() }
        ));
    };

    let kind = DocumentKind::from_declared(str_field(&raw, "type"));
    let name = str_field(&raw, "name")
        .map(str::to_owned)
        .unwrap_or_else(|| file_stem(path));

    Ok(Document {
        name,
        path: path.to_path_buf(),
        kind,
        raw,
        source,
    })
}

fn is_spec_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn str_field<'a>(raw: &'a Mapping, key: &str) -> Option<&'a str> {
    raw.get(Value::from(key)).and_then(Value::as_str)
}
