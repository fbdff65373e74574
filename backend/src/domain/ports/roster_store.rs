//! Driven port for the roster tables in the relational datastore.

use async_trait::async_trait;
use uuid::Uuid;

use super::define_port_error;
use crate::domain::{EntityKind, RosterCounts, RowDraft, StoredRow, UserRef};

define_port_error! {
    /// Errors raised by roster persistence adapters.
    pub enum RosterStoreError {
        /// The datastore could not be reached. Aborts the stage.
        Connection { message: String } =>
            "roster store connection failed: {message}",
        /// A row violated a uniqueness or foreign-key constraint.
        Constraint { message: String } =>
            "roster store constraint violated: {message}",
        /// Any other query failure.
        Query { message: String } =>
            "roster store query failed: {message}",
    }
}

impl RosterStoreError {
    /// Whether the error ends the stage instead of a single row.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Port for reading and writing organizations, teams and memberships.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Every existing row of `kind`.
    async fn snapshot(&self, kind: EntityKind) -> Result<Vec<StoredRow>, RosterStoreError>;

    /// Identity fields of every provisioned user.
    async fn user_refs(&self) -> Result<Vec<UserRef>, RosterStoreError>;

    /// Insert `rows` in one statement; all or nothing.
    async fn insert_batch(
        &self,
        kind: EntityKind,
        rows: &[RowDraft],
    ) -> Result<u64, RosterStoreError>;

    /// Insert a single row.
    async fn insert_row(&self, kind: EntityKind, row: &RowDraft) -> Result<(), RosterStoreError>;

    /// Overwrite the row with internal id `id`.
    async fn update_row(
        &self,
        kind: EntityKind,
        id: Uuid,
        row: &RowDraft,
    ) -> Result<(), RosterStoreError>;

    /// Current row totals.
    async fn counts(&self) -> Result<RosterCounts, RosterStoreError>;
}
