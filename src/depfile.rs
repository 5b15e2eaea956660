//! Reader for compiler-emitted dependency manifests ("depfiles").
//!
//! A depfile is a single line of the form `outputs : inputs` where both sides
//! are space separated path lists. Inside a path, a backslash escapes the
//! character that follows it, so `\ ` is a literal space and `\\` a literal
//! backslash. Only the inputs are of interest here; the outputs are ignored.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Token separating the outputs from the inputs. Only the first occurrence counts.
const SEPARATOR: &str = ": ";

#[derive(Debug, thiserror::Error)]
pub enum DepfileError {
    #[error("IO error reading depfile {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Malformed depfile {0}: no \": \" separator between outputs and inputs")]
    MissingSeparator(PathBuf),
    #[error("Malformed depfile {0}: trailing backslash escapes nothing")]
    DanglingEscape(PathBuf),
}

/// Why a depfile's text could not be parsed, independent of where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    MissingSeparator,
    DanglingEscape,
}

impl ParseFailure {
    fn at(self, path: &Path) -> DepfileError {
        match self {
            ParseFailure::MissingSeparator => DepfileError::MissingSeparator(path.to_path_buf()),
            ParseFailure::DanglingEscape => DepfileError::DanglingEscape(path.to_path_buf()),
        }
    }
}

/// Reads the depfile at `path` and returns the distinct set of input paths it lists.
///
/// Paths are returned as written; whether they exist is for the caller to find out.
pub fn read_dependencies(path: &Path) -> Result<BTreeSet<String>, DepfileError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == ErrorKind::PermissionDenied {
            DepfileError::PermissionDenied(path.to_path_buf())
        } else {
            DepfileError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let inputs = parse_dependencies(&content).map_err(|f| f.at(path))?;

    debug!("Depfile {} lists {} inputs", path.display(), inputs.len());

    Ok(inputs)
}

/// Extracts the input paths from depfile text.
///
/// Single pass over the text after the first `": "`: a backslash drops itself
/// and makes the next character literal, an unescaped space ends the current
/// path. Each path is trimmed and empty ones are discarded.
pub fn parse_dependencies(content: &str) -> Result<BTreeSet<String>, ParseFailure> {
    let (_outputs, inputs) = content
        .split_once(SEPARATOR)
        .ok_or(ParseFailure::MissingSeparator)?;

    let mut paths = BTreeSet::new();
    let mut current = String::new();
    let mut chars = inputs.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err(ParseFailure::DanglingEscape),
            },
            ' ' => flush_token(&mut current, &mut paths),
            _ => current.push(c),
        }
    }
    flush_token(&mut current, &mut paths);

    Ok(paths)
}

fn flush_token(current: &mut String, paths: &mut BTreeSet<String>) {
    let token = current.trim();
    if !token.is_empty() {
        paths.insert(token.to_string());
    }
    current.clear();
}
