//! Driving port for running sync stages.

use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{EntityKind, Error, StageOutcome};

/// Request for a single stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRequest {
    pub kind: EntityKind,
    /// Read from this CSV export instead of the CMS API.
    pub csv_path: Option<PathBuf>,
}

/// Request for organizations, teams and memberships in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullSyncRequest {
    /// Team export used by the teams and memberships stages.
    pub csv_path: Option<PathBuf>,
    /// Organization export; the CMS API is used when absent.
    pub organizations_csv_path: Option<PathBuf>,
}

/// Result of a stage that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub outcome: StageOutcome,
    /// `None` when the audit record could not be written.
    pub sync_log_id: Option<Uuid>,
}

/// Per-stage result inside a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    Completed(StageReport),
    /// The stage aborted; later stages were skipped.
    Failed {
        message: String,
        sync_log_id: Option<Uuid>,
    },
    /// An earlier stage aborted.
    Skipped,
}

impl StageResult {
    pub fn success(&self) -> bool {
        match self {
            Self::Completed(report) => report.outcome.success(),
            Self::Failed { .. } | Self::Skipped => false,
        }
    }
}

/// Result of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullSyncReport {
    pub organizations: StageResult,
    pub teams: StageResult,
    pub users: StageResult,
    /// Id of the combined `full` audit record.
    pub sync_log_id: Option<Uuid>,
}

impl FullSyncReport {
    pub fn success(&self) -> bool {
        self.organizations.success() && self.teams.success() && self.users.success()
    }
}

/// Driving port for the sync pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncCommand: Send + Sync {
    /// Run one stage. Stage-fatal failures are returned as errors after being
    /// recorded in the sync log.
    async fn run_stage(&self, request: StageRequest) -> Result<StageReport, Error>;

    /// Run every stage in dependency order, halting at the first stage-fatal
    /// failure.
    async fn run_full(&self, request: FullSyncRequest) -> Result<FullSyncReport, Error>;
}

/// Fixture command that syncs nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureSyncCommand;

#[async_trait]
impl SyncCommand for FixtureSyncCommand {
    async fn run_stage(&self, request: StageRequest) -> Result<StageReport, Error> {
        Ok(StageReport {
            outcome: StageOutcome::empty(request.kind),
            sync_log_id: None,
        })
    }

    async fn run_full(&self, _request: FullSyncRequest) -> Result<FullSyncReport, Error> {
        let [organizations, teams, users] = EntityKind::PIPELINE.map(|kind| {
            StageResult::Completed(StageReport {
                outcome: StageOutcome::empty(kind),
                sync_log_id: None,
            })
        });
        Ok(FullSyncReport {
            organizations,
            teams,
            users,
            sync_log_id: None,
        })
    }
}
