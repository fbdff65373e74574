//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (sources, stores, identity) are implemented by outbound
//! adapters; driving ports (`SyncCommand`, `SyncStatusQuery`) are consumed by
//! inbound adapters. Each port ships a fixture implementation and, under
//! `cfg(test)`, a `mockall` mock.

mod macros;
pub(crate) use macros::define_port_error;

mod identity_provider;
mod role_directory;
mod roster_source;
mod roster_store;
mod sync_command;
mod sync_log_repository;
mod sync_status_query;

#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{
    BearerToken, FixtureIdentityProvider, IdentityProvider, IdentityProviderError,
};
#[cfg(test)]
pub use role_directory::MockRoleDirectory;
pub use role_directory::{FixtureRoleDirectory, RoleDirectory, RoleDirectoryError};
#[cfg(test)]
pub use roster_source::MockRosterSource;
pub use roster_source::{FixtureRosterSource, RosterSource, RosterSourceError, SourceLocation};
#[cfg(test)]
pub use roster_store::MockRosterStore;
pub use roster_store::{RosterStore, RosterStoreError};
#[cfg(test)]
pub use sync_command::MockSyncCommand;
pub use sync_command::{
    FixtureSyncCommand, FullSyncReport, FullSyncRequest, StageReport, StageRequest, StageResult,
    SyncCommand,
};
#[cfg(test)]
pub use sync_log_repository::MockSyncLogRepository;
pub use sync_log_repository::{SyncLogRepository, SyncLogRepositoryError};
#[cfg(test)]
pub use sync_status_query::MockSyncStatusQuery;
pub use sync_status_query::{
    FixtureSyncStatusQuery, HistoryLimit, HistoryLimitError, SyncStatus, SyncStatusQuery,
};
