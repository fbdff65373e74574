//! Driving port for reporting current totals and recent sync runs.

use async_trait::async_trait;

use crate::domain::{Error, RosterCounts, SyncRun};

/// Number of history entries returned by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimit(u32);

/// Validation errors for [`HistoryLimit`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryLimitError {
    #[error("limit must be an integer")]
    NotANumber,
    #[error("limit must be between {min} and {max}", min = HistoryLimit::MIN, max = HistoryLimit::MAX)]
    OutOfRange,
}

impl HistoryLimit {
    pub const DEFAULT: u32 = 10;
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;

    /// Parse an optional query value, defaulting when absent.
    ///
    /// # Examples
    /// ```
    /// use roster_sync::domain::ports::HistoryLimit;
    ///
    /// assert_eq!(HistoryLimit::parse(None).map(HistoryLimit::get), Ok(10));
    /// assert_eq!(HistoryLimit::parse(Some("25")).map(HistoryLimit::get), Ok(25));
    /// assert!(HistoryLimit::parse(Some("0")).is_err());
    /// ```
    pub fn parse(raw: Option<&str>) -> Result<Self, HistoryLimitError> {
        let Some(raw) = raw.map(str::trim) else {
            return Ok(Self(Self::DEFAULT));
        };
        let value: i64 = raw.parse().map_err(|_| HistoryLimitError::NotANumber)?;
        u32::try_from(value)
            .ok()
            .filter(|limit| (Self::MIN..=Self::MAX).contains(limit))
            .map(Self)
            .ok_or(HistoryLimitError::OutOfRange)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for HistoryLimit {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Current totals plus recent runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    pub current_counts: RosterCounts,
    /// Newest first.
    pub sync_history: Vec<SyncRun>,
}

/// Driving port for the status endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncStatusQuery: Send + Sync {
    async fn status(&self, limit: HistoryLimit) -> Result<SyncStatus, Error>;
}

/// Fixture query reporting an empty datastore.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureSyncStatusQuery;

#[async_trait]
impl SyncStatusQuery for FixtureSyncStatusQuery {
    async fn status(&self, _limit: HistoryLimit) -> Result<SyncStatus, Error> {
        Ok(SyncStatus::default())
    }
}
