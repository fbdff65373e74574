//! Organization, team and membership synchronisation from a CMS into the
//! platform datastore.
//!
//! - **domain**: reconciliation, the sync pipeline and its ports
//! - **inbound**: the actix-web HTTP adapter
//! - **outbound**: CSV, CMS, auth-provider and PostgreSQL adapters

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
