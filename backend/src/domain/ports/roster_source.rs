//! Driven port for reading roster records from the CMS.

use std::path::PathBuf;

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::EntityKind;
use crate::domain::source_rows::SourceBatch;

/// Where a stage reads its records from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// A CSV export on local disk.
    Csv(PathBuf),
    /// The CMS REST API.
    Cms,
}

impl SourceLocation {
    /// CSV when a path is given, otherwise the CMS API.
    pub fn from_csv_path(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Cms, Self::Csv)
    }
}

define_port_error! {
    /// Stage-fatal failures raised while reading the source.
    pub enum RosterSourceError {
        /// Neither a readable file nor a reachable API response was obtained.
        Unavailable { message: String } =>
            "source unavailable: {message}",
        /// The payload could not be decoded at all.
        Decode { message: String } =>
            "source payload could not be decoded: {message}",
    }
}

/// Port for reading normalised roster records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Read every record of `kind` from `location`.
    ///
    /// Malformed rows are returned in [`SourceBatch::rejected`] rather than
    /// failing the read.
    async fn read(
        &self,
        kind: EntityKind,
        location: &SourceLocation,
    ) -> Result<SourceBatch, RosterSourceError>;
}

/// Fixture source that reports every location as unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureRosterSource;

#[async_trait]
impl RosterSource for FixtureRosterSource {
    async fn read(
        &self,
        kind: EntityKind,
        _location: &SourceLocation,
    ) -> Result<SourceBatch, RosterSourceError> {
        Err(RosterSourceError::unavailable(format!(
            "no source configured for {kind}"
        )))
    }
}
