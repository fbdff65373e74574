//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Implements the roster store, sync log and role directory ports on top of
//! `diesel-async` with `bb8` pooling. Row structs (`models.rs`) and table
//! definitions (`schema.rs`) stay private to this module; every database
//! failure is mapped to the owning port's error type.
//!
//! # Example
//!
//! ```ignore
//! use roster_sync::outbound::persistence::{DbPool, DieselRosterStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/roster")).await?;
//! let store = DieselRosterStore::new(pool);
//! ```

mod diesel_helpers;
mod diesel_role_directory;
mod diesel_roster_store;
mod diesel_sync_log_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_role_directory::DieselRoleDirectory;
pub use diesel_roster_store::DieselRosterStore;
pub use diesel_sync_log_repository::DieselSyncLogRepository;
pub use migrations::{MIGRATIONS, MigrationError, apply_migrations, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
