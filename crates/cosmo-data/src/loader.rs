//! File-level plumbing: format detection, file discovery and deserialization.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and deserialization
//! helpers used by the content loading pipeline in [`crate::content`].

use cosmo_tech_tree::TechTreeError;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during content loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file or directory was not found.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A symbolic value (environment, size, unlock type...) is not known.
    #[error("unknown {kind} '{value}' in {file}")]
    UnknownEnumValue {
        file: PathBuf,
        kind: &'static str,
        value: String,
    },

    /// A named constant is not defined in the content configuration.
    #[error("unknown constant '{name}' in {file}")]
    UnknownConstant { file: PathBuf, name: String },

    /// A number that must be finite was NaN or infinite.
    #[error("non-finite {context} ({value}) in {file}")]
    NonFinite {
        file: PathBuf,
        context: &'static str,
        value: f64,
    },

    /// A field that must be present was omitted.
    #[error("missing field '{field}' in {context} ({file})")]
    MissingField {
        file: PathBuf,
        field: &'static str,
        context: String,
    },

    /// A record parsed but was rejected by the tech tree.
    #[error("rejected record in {file}: {source}")]
    Rejected {
        file: PathBuf,
        #[source]
        source: TechTreeError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DataLoadError {
    /// The file the error was found in, if any.
    pub fn file(&self) -> Option<&Path> {
        match self {
            DataLoadError::UnsupportedFormat { file }
            | DataLoadError::Parse { file, .. }
            | DataLoadError::UnknownEnumValue { file, .. }
            | DataLoadError::UnknownConstant { file, .. }
            | DataLoadError::NonFinite { file, .. }
            | DataLoadError::MissingField { file, .. }
            | DataLoadError::Rejected { file, .. } => Some(file),
            DataLoadError::ConflictingFormats { b, .. } => Some(b),
            DataLoadError::MissingRequired { .. } | DataLoadError::Io(_) => None,
        }
    }
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    pub const EXTENSIONS: [&'static str; 3] = ["ron", "toml", "json"];
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in Format::EXTENSIONS {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

/// Every data file under `dir`, recursively, in sorted path order.
///
/// Files with other extensions are ignored, and symlinked directories are
/// not entered. When files in one directory share a base name, each one after
/// the first (in path order) is reported against the first as
/// [`DataLoadError::ConflictingFormats`] and none of them is returned.
pub fn discover_data_files(dir: &Path) -> Result<(Vec<PathBuf>, Vec<DataLoadError>), DataLoadError> {
    let mut by_stem: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            // Symlinked directories are not followed.
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if detect_format(&path).is_ok() {
                by_stem
                    .entry(path.with_extension(""))
                    .or_default()
                    .push(path);
            }
        }
    }

    let mut files = Vec::new();
    let mut conflicts = Vec::new();
    for (_, mut paths) in by_stem {
        paths.sort();
        let mut paths = paths.into_iter();
        let Some(first) = paths.next() else {
            continue;
        };
        let mut extra = paths.peekable();
        if extra.peek().is_none() {
            files.push(first);
            continue;
        }
        for b in extra {
            conflicts.push(DataLoadError::ConflictingFormats {
                a: first.clone(),
                b,
            });
        }
    }
    files.sort();
    Ok((files, conflicts))
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(format, &content, path)
}

/// Deserialize already-read text. `path` is only used in error messages.
pub fn deserialize_str<T: DeserializeOwned>(
    format: Format,
    content: &str,
    path: &Path,
) -> Result<T, DataLoadError> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron | Format::Json => deserialize_str(format, &content, path),
        Format::Toml => {
            let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Resolve a symbolic name with `from_name`, returning an `UnknownEnumValue`
/// error if it is not recognised.
pub fn resolve_enum<T>(
    value: &str,
    kind: &'static str,
    file: &Path,
    from_name: impl Fn(&str) -> Option<T>,
) -> Result<T, DataLoadError> {
    from_name(value).ok_or_else(|| DataLoadError::UnknownEnumValue {
        file: file.to_path_buf(),
        kind,
        value: value.to_string(),
    })
}

/// Look up a named constant, returning an `UnknownConstant` error if absent.
pub fn resolve_constant<V: Copy>(
    map: &BTreeMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<V, DataLoadError> {
    map.get(name)
        .copied()
        .ok_or_else(|| DataLoadError::UnknownConstant {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
}

/// Reject NaN and infinities before they reach fixed-point conversion.
pub fn require_finite(value: f64, context: &'static str, file: &Path) -> Result<f64, DataLoadError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DataLoadError::NonFinite {
            file: file.to_path_buf(),
            context,
            value,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
