//! Activity sources: where the desired per-day counts come from.

use std::path::{Path, PathBuf};

use mirror_core::{AccountName, ContributionMap, DateRange};

use crate::error::SourceError;

/// Read-only oracle of desired contribution counts.
///
/// Implementations return counts for days inside `range` only.
pub trait ActivitySource {
    fn desired(&self, account: &AccountName, range: &DateRange) -> Result<ContributionMap, SourceError>;
}

/// In-memory source; used for tests and for replaying known calendars.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    counts: ContributionMap,
}

impl StaticSource {
    pub fn new(counts: ContributionMap) -> Self {
        Self { counts }
    }
}

impl ActivitySource for StaticSource {
    fn desired(&self, _account: &AccountName, range: &DateRange) -> Result<ContributionMap, SourceError> {
        Ok(self.counts.restrict(range))
    }
}

/// JSON file of the form `{"2024-01-01": 3, ...}`, read on every call.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActivitySource for FileSource {
    fn desired(&self, _account: &AccountName, range: &DateRange) -> Result<ContributionMap, SourceError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| SourceError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        let counts: ContributionMap = serde_json::from_str(&contents)
            .map_err(|e| SourceError::Malformed(format!("{}: {e}", self.path.display())))?;
        Ok(counts.restrict(range))
    }
}
