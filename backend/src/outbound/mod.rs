//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **csv_export** and **cms**: the two roster sources, joined behind
//!   [`roster_source::ExportRosterSource`]
//! - **persistence**: PostgreSQL-backed stores using Diesel ORM
//! - **identity**: bearer-token verification against the auth provider
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod cms;
pub mod csv_export;
pub mod identity;
pub mod persistence;
pub mod roster_source;
