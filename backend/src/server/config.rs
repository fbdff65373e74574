//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use roster_sync::domain::ports::IdentityProvider;
use roster_sync::outbound::persistence::DbPool;
use roster_sync::outbound::roster_source::ExportRosterSource;

/// Builder-style configuration for creating the HTTP server.
///
/// Ports without a configured adapter fall back to fixtures, which reject
/// every token and sync nothing.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) roster_source: Option<Arc<ExportRosterSource>>,
    pub(crate) identity: Option<Arc<dyn IdentityProvider>>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            db_pool: None,
            roster_source: None,
            identity: None,
        }
    }

    /// Attach the pool shared by the roster store, sync log and role lookups.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_roster_source(mut self, source: ExportRosterSource) -> Self {
        self.roster_source = Some(Arc::new(source));
        self
    }

    #[must_use]
    pub fn with_identity_provider(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
