//! Stage outcomes and the audit records persisted for every sync run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::roster::{EntityKind, ExternalId};

/// Why a single row could not be synchronised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RowErrorReason {
    /// Missing identifier or name, or a duplicated identifier.
    MalformedRecord,
    /// The referenced organization or team does not exist.
    OrphanedParent,
    /// The referenced user is not provisioned.
    UnknownUser,
    /// The datastore rejected the row.
    WriterRowFailure,
}

/// Row-level failure reported back to callers as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub reason: RowErrorReason,
    pub message: String,
}

impl RowError {
    pub fn new(
        external_id: Option<&ExternalId>,
        reason: RowErrorReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.map(|id| id.as_str().to_owned()),
            reason,
            message: message.into(),
        }
    }

    pub fn malformed(external_id: Option<&ExternalId>, message: impl Into<String>) -> Self {
        Self::new(external_id, RowErrorReason::MalformedRecord, message)
    }
}

/// Counts produced by one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub kind: EntityKind,
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub errors: Vec<RowError>,
}

impl StageOutcome {
    pub fn empty(kind: EntityKind) -> Self {
        Self {
            kind,
            processed: 0,
            created: 0,
            updated: 0,
            unchanged: 0,
            errors: Vec::new(),
        }
    }

    /// A stage succeeds when no row failed.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Sync run category stored in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Organizations,
    Teams,
    Users,
    Full,
}

impl SyncType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organizations => "organizations",
            Self::Teams => "teams",
            Self::Users => "users",
            Self::Full => "full",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "organizations" => Some(Self::Organizations),
            "teams" => Some(Self::Teams),
            "users" => Some(Self::Users),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

impl From<EntityKind> for SyncType {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Organizations => Self::Organizations,
            EntityKind::Teams => Self::Teams,
            EntityKind::Memberships => Self::Users,
        }
    }
}

/// Final state of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunStatus {
    /// Every row was written or unchanged.
    Completed,
    /// The stage aborted or at least one row failed.
    Failed,
}

impl SyncRunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Immutable audit record for one stage or one full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
    pub id: Uuid,
    pub sync_type: SyncType,
    pub status: SyncRunStatus,
    pub records_processed: u64,
    pub records_created: u64,
    pub records_updated: u64,
    pub errors: Vec<RowError>,
    /// Stage-fatal failure message, when the run aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Per-stage breakdown for full runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncRun {
    /// Audit record for a stage that ran to completion.
    pub fn from_outcome(
        outcome: &StageOutcome,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sync_type: outcome.kind.into(),
            status: if outcome.success() {
                SyncRunStatus::Completed
            } else {
                SyncRunStatus::Failed
            },
            records_processed: outcome.processed,
            records_created: outcome.created,
            records_updated: outcome.updated,
            errors: outcome.errors.clone(),
            error_message: None,
            metadata: None,
            started_at,
            finished_at,
        }
    }

    /// Audit record for a stage that aborted.
    pub fn aborted(
        sync_type: SyncType,
        message: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sync_type,
            status: SyncRunStatus::Failed,
            records_processed: 0,
            records_created: 0,
            records_updated: 0,
            errors: Vec::new(),
            error_message: Some(message.into()),
            metadata: None,
            started_at,
            finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SyncType::Organizations)]
    #[case(SyncType::Teams)]
    #[case(SyncType::Users)]
    #[case(SyncType::Full)]
    fn sync_type_labels_parse_back(#[case] sync_type: SyncType) {
        assert_eq!(SyncType::parse(sync_type.as_str()), Some(sync_type));
    }

    #[rstest]
    fn memberships_are_logged_as_users() {
        assert_eq!(SyncType::from(EntityKind::Memberships), SyncType::Users);
    }

    #[rstest]
    fn row_errors_fail_the_run() {
        let now = Utc::now();
        let mut outcome = StageOutcome::empty(EntityKind::Teams);
        outcome.errors.push(RowError::new(
            None,
            RowErrorReason::OrphanedParent,
            "organization org-9 not found",
        ));
        let run = SyncRun::from_outcome(&outcome, now, now);
        assert_eq!(run.status, SyncRunStatus::Failed);
        assert_eq!(run.sync_type, SyncType::Teams);
    }

    #[rstest]
    fn row_error_reason_serialises_by_variant_name() {
        let error = RowError::new(None, RowErrorReason::OrphanedParent, "missing");
        let value = serde_json::to_value(error).expect("serialise");
        assert_eq!(value["reason"], "OrphanedParent");
        assert!(value.get("externalId").is_none());
    }
}
