//! Content fingerprints of a build action's inputs.
//!
//! A [`Fingerprint`] binds a [`BuildConfig`] to the SHA-256 digest of every
//! input file. It is persisted as TOML, tagged with the revision of this tool,
//! and a persisted fingerprint from any other revision is refused on load.

use crate::checksum::{ChecksumError, checksum_file};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Revision stamped into every serialized fingerprint.
pub const TOOL_REVISION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Missing input files: {}", display_paths(.0))]
    MissingInputs(Vec<PathBuf>),
    #[error("Input path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
    #[error("Checksum error: {0}")]
    Checksum(#[from] ChecksumError),
    #[error("Stamp was written by revision {}, expected {expected}", .found.as_deref().unwrap_or("<none>"))]
    InvalidSchema {
        expected: String,
        found: Option<String>,
    },
    #[error("Stamp is missing required field {0}")]
    MissingField(Field),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fields of a persisted fingerprint that must be present on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    BuildMode,
    TargetPlatform,
    FileHashes,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::BuildMode => "build.mode",
            Field::TargetPlatform => "build.target_platform",
            Field::FileHashes => "files",
        })
    }
}

/// The configuration a build action runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    build_mode: String,
    /// Empty means unspecified.
    target_platform: String,
}

impl BuildConfig {
    pub fn new(build_mode: impl Into<String>, target_platform: Option<&str>) -> Self {
        BuildConfig {
            build_mode: build_mode.into(),
            target_platform: target_platform.unwrap_or_default().to_string(),
        }
    }

    pub fn build_mode(&self) -> &str {
        &self.build_mode
    }

    pub fn target_platform(&self) -> &str {
        &self.target_platform
    }
}

#[derive(Debug, Clone)]
pub struct Fingerprint {
    config: BuildConfig,
    /// Input path as given, mapped to the hex SHA-256 of its contents.
    file_hashes: BTreeMap<String, String>,
    schema_version: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Metadata {
    version: String,
}

#[derive(Debug, Serialize)]
struct StampDocument<'a> {
    metadata: Metadata,
    build: BuildSection<'a>,
    files: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct BuildSection<'a> {
    mode: &'a str,
    target_platform: &'a str,
}

/// Extracts only the revision so it can be checked before anything else in
/// the document is interpreted. Unknown content is deliberately tolerated.
#[derive(Debug, Deserialize)]
struct MetadataOnly {
    #[serde(default)]
    metadata: Option<MetadataProbe>,
}

#[derive(Debug, Deserialize)]
struct MetadataProbe {
    #[serde(default)]
    version: Option<toml::Value>,
}

/// Full document with every section optional so that absence can be
/// reported per field, in a fixed order.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStamp {
    #[allow(dead_code)]
    metadata: Metadata,
    #[serde(default)]
    build: Option<RawBuild>,
    #[serde(default)]
    files: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuild {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    target_platform: Option<String>,
}

impl Fingerprint {
    /// Fingerprints the current contents of `paths` under `config`.
    ///
    /// Every path must name an existing file. If any do not, all of them are
    /// reported in `MissingInputs` and nothing is read. Duplicate paths are
    /// hashed once. Files are hashed in parallel; when several fail, the error
    /// for the lexicographically first path is returned.
    pub fn from_files<I, P>(config: &BuildConfig, paths: I) -> Result<Self, FingerprintError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut inputs: BTreeMap<String, PathBuf> = BTreeMap::new();
        for path in paths {
            let path = path.as_ref();
            let key = path
                .to_str()
                .ok_or_else(|| FingerprintError::NonUtf8Path(path.to_path_buf()))?;
            inputs.insert(key.to_string(), path.to_path_buf());
        }

        let missing: Vec<PathBuf> = inputs
            .values()
            .filter(|path| !path.is_file())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(FingerprintError::MissingInputs(missing));
        }

        let inputs: Vec<(String, PathBuf)> = inputs.into_iter().collect();
        let digests: Vec<Result<String, ChecksumError>> = inputs
            .par_iter()
            .map(|(_, path)| checksum_file(path))
            .collect();

        let mut file_hashes = BTreeMap::new();
        for ((key, path), digest) in inputs.into_iter().zip(digests) {
            file_hashes.insert(key, vanished_as_missing(path, digest)?);
        }

        debug!(
            "Fingerprinted {} inputs for mode {:?}, platform {:?}",
            file_hashes.len(),
            config.build_mode(),
            config.target_platform()
        );

        Ok(Fingerprint {
            config: config.clone(),
            file_hashes,
            schema_version: TOOL_REVISION.to_string(),
        })
    }

    pub fn build_mode(&self) -> &str {
        self.config.build_mode()
    }

    pub fn target_platform(&self) -> &str {
        self.config.target_platform()
    }

    pub fn file_hashes(&self) -> &BTreeMap<String, String> {
        &self.file_hashes
    }

    /// Revision the fingerprint was produced or loaded under.
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Whether both fingerprints describe the same configuration and the same
    /// input contents. The schema version is not compared.
    pub fn same_inputs(&self, other: &Fingerprint) -> bool {
        self.config.build_mode == other.config.build_mode
            && self.config.target_platform == other.config.target_platform
            && self.file_hashes.len() == other.file_hashes.len()
            && self
                .file_hashes
                .iter()
                .all(|(path, digest)| other.file_hashes.get(path) == Some(digest))
    }

    /// Serialize to the persisted TOML form.
    pub fn to_toml(&self) -> Result<String, FingerprintError> {
        let document = StampDocument {
            metadata: Metadata {
                version: self.schema_version.clone(),
            },
            build: BuildSection {
                mode: self.config.build_mode(),
                target_platform: self.config.target_platform(),
            },
            files: &self.file_hashes,
        };
        Ok(toml::to_string_pretty(&document)?)
    }

    /// Parse a persisted fingerprint written by this revision of the tool.
    pub fn from_toml(content: &str) -> Result<Self, FingerprintError> {
        Self::from_toml_for_revision(content, TOOL_REVISION)
    }

    /// Parse a persisted fingerprint, accepting only `revision`.
    ///
    /// Checks run in order: revision, build mode (present and non-empty),
    /// target platform (present, may be empty), file hashes (present).
    pub fn from_toml_for_revision(content: &str, revision: &str) -> Result<Self, FingerprintError> {
        let probe: MetadataOnly = toml::from_str(content)?;
        let found = probe
            .metadata
            .and_then(|m| m.version)
            .map(|v| match v {
                toml::Value::String(s) => s,
                other => other.to_string(),
            });

        if found.as_deref() != Some(revision) {
            return Err(FingerprintError::InvalidSchema {
                expected: revision.to_string(),
                found,
            });
        }

        let raw: RawStamp = toml::from_str(content)?;
        let (mode, target_platform) = match raw.build {
            Some(build) => (build.mode, build.target_platform),
            None => (None, None),
        };

        let build_mode = mode
            .filter(|m| !m.is_empty())
            .ok_or(FingerprintError::MissingField(Field::BuildMode))?;
        let target_platform =
            target_platform.ok_or(FingerprintError::MissingField(Field::TargetPlatform))?;
        let file_hashes = raw
            .files
            .ok_or(FingerprintError::MissingField(Field::FileHashes))?;

        Ok(Fingerprint {
            config: BuildConfig {
                build_mode,
                target_platform,
            },
            file_hashes,
            schema_version: revision.to_string(),
        })
    }

    /// Load a fingerprint from the filesystem.
    pub fn load(path: &Path) -> Result<Self, FingerprintError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::PermissionDenied {
                FingerprintError::PermissionDenied(path.to_path_buf())
            } else {
                FingerprintError::Io(e)
            }
        })?;

        Self::from_toml(&content)
    }

    /// Save the fingerprint atomically.
    ///
    /// Writes to a temporary file next to `path`, fsyncs it, then renames it into place.
    pub fn save(&self, path: &Path) -> Result<(), FingerprintError> {
        use std::io::Write;

        let content = self.to_toml()?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let classify = |e: std::io::Error, at: &Path| {
            if e.kind() == ErrorKind::PermissionDenied {
                FingerprintError::PermissionDenied(at.to_path_buf())
            } else {
                FingerprintError::Io(e)
            }
        };

        let mut temp_file =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| classify(e, parent))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| classify(e, path))?;
        temp_file.as_file().sync_all().map_err(FingerprintError::Io)?;
        temp_file.persist(path).map_err(|e| classify(e.error, path))?;

        Ok(())
    }
}

/// A file deleted between the existence check and its read is still a
/// missing input, not an I/O failure.
fn vanished_as_missing(
    path: PathBuf,
    digest: Result<String, ChecksumError>,
) -> Result<String, FingerprintError> {
    match digest {
        Err(ChecksumError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            Err(FingerprintError::MissingInputs(vec![path]))
        }
        other => Ok(other?),
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.same_inputs(other)
    }
}

impl Eq for Fingerprint {}
