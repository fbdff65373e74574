//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on domain ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    FixtureIdentityProvider, FixtureRoleDirectory, FixtureSyncCommand, FixtureSyncStatusQuery,
    IdentityProvider, RoleDirectory, SyncCommand, SyncStatusQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub sync: Arc<dyn SyncCommand>,
    pub status: Arc<dyn SyncStatusQuery>,
    pub identity: Arc<dyn IdentityProvider>,
    pub roles: Arc<dyn RoleDirectory>,
}

impl HttpState {
    pub fn new(
        sync: Arc<dyn SyncCommand>,
        status: Arc<dyn SyncStatusQuery>,
        identity: Arc<dyn IdentityProvider>,
        roles: Arc<dyn RoleDirectory>,
    ) -> Self {
        Self {
            sync,
            status,
            identity,
            roles,
        }
    }

    /// State wired to fixtures: every token is rejected and nothing syncs.
    pub fn fixture() -> Self {
        Self::new(
            Arc::new(FixtureSyncCommand),
            Arc::new(FixtureSyncStatusQuery),
            Arc::new(FixtureIdentityProvider),
            Arc::new(FixtureRoleDirectory),
        )
    }
}
