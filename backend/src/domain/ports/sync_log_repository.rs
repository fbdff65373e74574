//! Driven port for the append-only sync run log.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::SyncRun;

define_port_error! {
    /// Errors raised by sync log adapters.
    pub enum SyncLogRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "sync log connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "sync log query failed: {message}",
    }
}

/// Port for persisting and listing sync run records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncLogRepository: Send + Sync {
    /// Append `run`. Records are never modified afterwards.
    async fn record(&self, run: &SyncRun) -> Result<(), SyncLogRepositoryError>;

    /// The `limit` most recently recorded runs, latest first.
    async fn history(&self, limit: u32) -> Result<Vec<SyncRun>, SyncLogRepositoryError>;
}
