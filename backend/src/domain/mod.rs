//! Domain primitives, ports and the sync pipeline.
//!
//! Public surface:
//! - [`Error`] / [`ErrorCode`]: transport-agnostic failures.
//! - Roster model: [`SourceRecord`], [`RowDraft`], [`StoredRow`].
//! - [`RosterSyncService`]: implements the driving ports in [`ports`].
//! - [`auth::authorize`]: the one authorization policy.

pub mod auth;
pub mod cms_conventions;
pub mod error;
pub mod ports;
pub mod reconcile;
pub mod roster;
pub mod source_rows;
pub mod sync_run;
mod sync_service;
mod trace_id;
pub mod writer;

pub use self::auth::{Caller, Permission, RoleSet, UserId};
pub use self::error::{Error, ErrorCode, TRACE_ID_HEADER};
pub use self::roster::{
    EntityKind, ExternalId, ExternalIdError, ExtraFields, MatchKey, RosterCounts, RowDraft,
    RowLinks, SourceRecord, StoredRow, UserRef,
};
pub use self::sync_run::{RowError, RowErrorReason, StageOutcome, SyncRun, SyncRunStatus, SyncType};
pub use self::sync_service::RosterSyncService;
pub use self::trace_id::TraceId;
