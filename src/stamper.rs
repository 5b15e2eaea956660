use crate::depfile::{DepfileError, read_dependencies};
use crate::fingerprint::{BuildConfig, Fingerprint, FingerprintError};
use std::collections::BTreeSet;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StamperError {
    #[error("Depfile error: {0}")]
    Depfile(#[from] DepfileError),
    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// The stored stamp matches the current inputs; the previous output can be reused.
    Fresh,
    Stale(StaleReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    NoPreviousStamp,
    /// The stored stamp exists but could not be trusted (other revision,
    /// missing fields, unreadable).
    UnusableStamp(String),
    InputsChanged,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::NoPreviousStamp => f.write_str("no previous stamp"),
            StaleReason::UnusableStamp(why) => write!(f, "previous stamp unusable: {why}"),
            StaleReason::InputsChanged => f.write_str("inputs or configuration changed"),
        }
    }
}

/// Decides whether one build action is up to date, and records it once it is.
///
/// The input set is the union of the explicitly declared inputs and every
/// input listed by the action's depfiles.
#[derive(Debug, Clone)]
pub struct Stamper {
    stamp_path: PathBuf,
    config: BuildConfig,
    inputs: Vec<PathBuf>,
    depfiles: Vec<PathBuf>,
}

impl Stamper {
    pub fn new(stamp_path: impl Into<PathBuf>, config: BuildConfig) -> Self {
        Stamper {
            stamp_path: stamp_path.into(),
            config,
            inputs: Vec::new(),
            depfiles: Vec::new(),
        }
    }

    pub fn inputs<I, P>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    pub fn depfiles<I, P>(mut self, depfiles: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.depfiles.extend(depfiles.into_iter().map(Into::into));
        self
    }

    pub fn stamp_path(&self) -> &Path {
        &self.stamp_path
    }

    /// Every input of the action, deduplicated.
    pub fn collect_inputs(&self) -> Result<BTreeSet<PathBuf>, StamperError> {
        let mut all: BTreeSet<PathBuf> = self.inputs.iter().cloned().collect();
        for depfile in &self.depfiles {
            all.extend(read_dependencies(depfile)?.into_iter().map(PathBuf::from));
        }
        Ok(all)
    }

    pub fn build_fingerprint(&self) -> Result<Fingerprint, StamperError> {
        let inputs = self.collect_inputs()?;
        Ok(Fingerprint::from_files(&self.config, &inputs)?)
    }

    /// Compares the stored stamp against the current inputs.
    ///
    /// A missing or untrustworthy stamp only makes the action stale. Problems
    /// with the inputs themselves (missing files, bad depfiles) are errors.
    pub fn check(&self) -> Result<Freshness, StamperError> {
        // Inputs first: a broken input set aborts even without a usable stamp.
        let current = self.build_fingerprint()?;

        let stored = match Fingerprint::load(&self.stamp_path) {
            Ok(fp) => fp,
            Err(FingerprintError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                debug!("No stamp at {}", self.stamp_path.display());
                return Ok(Freshness::Stale(StaleReason::NoPreviousStamp));
            }
            Err(e) => {
                warn!("Ignoring stamp {}: {}", self.stamp_path.display(), e);
                return Ok(Freshness::Stale(StaleReason::UnusableStamp(e.to_string())));
            }
        };

        if stored.same_inputs(&current) {
            info!("{} is up to date", self.stamp_path.display());
            Ok(Freshness::Fresh)
        } else {
            Ok(Freshness::Stale(StaleReason::InputsChanged))
        }
    }

    /// Fingerprints the current inputs and saves the result as the new stamp.
    pub fn write(&self) -> Result<Fingerprint, StamperError> {
        let fingerprint = self.build_fingerprint()?;
        fingerprint.save(&self.stamp_path)?;
        info!(
            "Wrote stamp {} covering {} inputs",
            self.stamp_path.display(),
            fingerprint.file_hashes().len()
        );
        Ok(fingerprint)
    }
}
