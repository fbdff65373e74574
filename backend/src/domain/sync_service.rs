//! Sync pipeline orchestration.
//!
//! Each stage runs Source Reader → Reconciler → Writer → Sync Log. A full run
//! executes organizations, teams and memberships in that order so parents
//! always exist before their children, and stops at the first stage-fatal
//! failure.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use super::ports::{
    FullSyncReport, FullSyncRequest, HistoryLimit, RosterSource, RosterSourceError, RosterStore,
    RosterStoreError, SourceLocation, StageReport, StageRequest, StageResult, SyncCommand,
    SyncLogRepository, SyncLogRepositoryError, SyncStatus, SyncStatusQuery,
};
use super::reconcile::{ResolutionIndex, reconcile};
use super::roster::EntityKind;
use super::sync_run::{StageOutcome, SyncRun, SyncRunStatus, SyncType};
use super::writer::StageWriter;
use super::Error;

/// Stage-fatal failure.
#[derive(Debug, thiserror::Error)]
enum StageFailure {
    #[error(transparent)]
    Source(#[from] RosterSourceError),
    #[error(transparent)]
    Store(#[from] RosterStoreError),
}

impl StageFailure {
    fn into_error(self) -> Error {
        match self {
            Self::Source(error) => Error::service_unavailable("Source unavailable", error.to_string()),
            Self::Store(error @ RosterStoreError::Connection { .. }) => {
                Error::service_unavailable("Datastore unavailable", error.to_string())
            }
            Self::Store(error) => Error::internal(error.to_string()),
        }
    }
}

/// Domain service implementing [`SyncCommand`] and [`SyncStatusQuery`].
#[derive(Clone)]
pub struct RosterSyncService<Src, Store, Log> {
    source: Arc<Src>,
    store: Arc<Store>,
    log: Arc<Log>,
    clock: Arc<dyn Clock>,
}

impl<Src, Store, Log> RosterSyncService<Src, Store, Log> {
    pub fn new(source: Arc<Src>, store: Arc<Store>, log: Arc<Log>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            store,
            log,
            clock,
        }
    }
}

impl<Src, Store, Log> RosterSyncService<Src, Store, Log>
where
    Src: RosterSource,
    Store: RosterStore,
    Log: SyncLogRepository,
{
    async fn execute_stage(
        &self,
        kind: EntityKind,
        location: &SourceLocation,
    ) -> Result<StageOutcome, StageFailure> {
        let batch = self.source.read(kind, location).await?;
        let snapshot = self.store.snapshot(kind).await?;
        let index = self.resolution_index(kind).await?;

        let processed = batch.processed();
        let plan = reconcile(kind, batch.records, &snapshot, &index);
        let written = StageWriter::new(self.store.as_ref())
            .apply(kind, &plan)
            .await?;

        let mut errors = batch.rejected;
        errors.extend(plan.errors);
        errors.extend(written.errors);
        Ok(StageOutcome {
            kind,
            processed,
            created: written.created,
            updated: written.updated,
            unchanged: plan.unchanged,
            errors,
        })
    }

    async fn resolution_index(&self, kind: EntityKind) -> Result<ResolutionIndex, RosterStoreError> {
        let index = ResolutionIndex::default();
        Ok(match kind {
            EntityKind::Organizations => index,
            EntityKind::Teams => {
                let organizations = self.store.snapshot(EntityKind::Organizations).await?;
                index.with_organizations(&organizations)
            }
            EntityKind::Memberships => {
                let teams = self.store.snapshot(EntityKind::Teams).await?;
                let users = self.store.user_refs().await?;
                index.with_teams(&teams).with_users(&users)
            }
        })
    }

    /// Run one stage and record it, returning the report or the stage-fatal
    /// failure alongside the id of its audit record.
    async fn run_recorded(
        &self,
        kind: EntityKind,
        location: &SourceLocation,
    ) -> Result<StageReport, (StageFailure, Option<Uuid>)> {
        let started_at = self.clock.utc();
        match self.execute_stage(kind, location).await {
            Ok(outcome) => {
                info!(
                    %kind,
                    processed = outcome.processed,
                    created = outcome.created,
                    updated = outcome.updated,
                    unchanged = outcome.unchanged,
                    errors = outcome.errors.len(),
                    "sync stage finished"
                );
                let run = SyncRun::from_outcome(&outcome, started_at, self.clock.utc());
                let sync_log_id = self.record(&run).await;
                Ok(StageReport {
                    outcome,
                    sync_log_id,
                })
            }
            Err(failure) => {
                warn!(%kind, error = %failure, "sync stage aborted");
                let run = SyncRun::aborted(
                    kind.into(),
                    failure.to_string(),
                    started_at,
                    self.clock.utc(),
                );
                let sync_log_id = self.record(&run).await;
                Err((failure, sync_log_id))
            }
        }
    }

    /// Persist `run`; a log failure never undoes the stage.
    async fn record(&self, run: &SyncRun) -> Option<Uuid> {
        match self.log.record(run).await {
            Ok(()) => Some(run.id),
            Err(error) => {
                warn!(sync_type = run.sync_type.as_str(), %error, "failed to write sync log");
                None
            }
        }
    }

    /// Run `kind` unless an earlier stage aborted; an abort sets `halted`.
    async fn run_in_chain(
        &self,
        kind: EntityKind,
        location: &SourceLocation,
        halted: &mut bool,
    ) -> StageResult {
        if *halted {
            return StageResult::Skipped;
        }
        match self.run_recorded(kind, location).await {
            Ok(report) => StageResult::Completed(report),
            Err((failure, sync_log_id)) => {
                *halted = true;
                StageResult::Failed {
                    message: failure.to_string(),
                    sync_log_id,
                }
            }
        }
    }

    fn full_run_record(
        &self,
        results: &[(EntityKind, &StageResult)],
        started_at: DateTime<Utc>,
    ) -> SyncRun {
        let mut run = SyncRun {
            id: Uuid::new_v4(),
            sync_type: SyncType::Full,
            status: SyncRunStatus::Completed,
            records_processed: 0,
            records_created: 0,
            records_updated: 0,
            errors: Vec::new(),
            error_message: None,
            metadata: None,
            started_at,
            finished_at: self.clock.utc(),
        };
        let mut stages = serde_json::Map::new();
        for (kind, result) in results {
            stages.insert(SyncType::from(*kind).as_str().to_owned(), stage_metadata(result));
            if !result.success() {
                run.status = SyncRunStatus::Failed;
            }
            match result {
                StageResult::Completed(report) => {
                    run.records_processed += report.outcome.processed;
                    run.records_created += report.outcome.created;
                    run.records_updated += report.outcome.updated;
                    run.errors.extend(report.outcome.errors.iter().cloned());
                }
                StageResult::Failed { message, .. } => {
                    run.error_message
                        .get_or_insert_with(|| format!("{kind} stage failed: {message}"));
                }
                StageResult::Skipped => {}
            }
        }
        run.metadata = Some(Value::Object(stages));
        run
    }
}

fn stage_metadata(result: &StageResult) -> Value {
    match result {
        StageResult::Completed(report) => json!({
            "status": if report.outcome.success() { "completed" } else { "failed" },
            "processed": report.outcome.processed,
            "created": report.outcome.created,
            "updated": report.outcome.updated,
            "errors": report.outcome.errors.len(),
            "syncLogId": report.sync_log_id,
        }),
        StageResult::Failed {
            message,
            sync_log_id,
        } => json!({
            "status": "failed",
            "message": message,
            "syncLogId": sync_log_id,
        }),
        StageResult::Skipped => json!({ "status": "skipped" }),
    }
}

#[async_trait]
impl<Src, Store, Log> SyncCommand for RosterSyncService<Src, Store, Log>
where
    Src: RosterSource,
    Store: RosterStore,
    Log: SyncLogRepository,
{
    async fn run_stage(&self, request: StageRequest) -> Result<StageReport, Error> {
        let location = SourceLocation::from_csv_path(request.csv_path);
        self.run_recorded(request.kind, &location)
            .await
            .map_err(|(failure, _)| failure.into_error())
    }

    async fn run_full(&self, request: FullSyncRequest) -> Result<FullSyncReport, Error> {
        let started_at = self.clock.utc();
        let team_location = SourceLocation::from_csv_path(request.csv_path);
        let organization_location = SourceLocation::from_csv_path(request.organizations_csv_path);

        let mut halted = false;
        let organizations = self
            .run_in_chain(EntityKind::Organizations, &organization_location, &mut halted)
            .await;
        let teams = self
            .run_in_chain(EntityKind::Teams, &team_location, &mut halted)
            .await;
        let users = self
            .run_in_chain(EntityKind::Memberships, &team_location, &mut halted)
            .await;

        let run = self.full_run_record(
            &[
                (EntityKind::Organizations, &organizations),
                (EntityKind::Teams, &teams),
                (EntityKind::Memberships, &users),
            ],
            started_at,
        );
        let sync_log_id = self.record(&run).await;
        info!(success = run.status == SyncRunStatus::Completed, "full sync finished");

        Ok(FullSyncReport {
            organizations,
            teams,
            users,
            sync_log_id,
        })
    }
}

fn map_log_error(error: SyncLogRepositoryError) -> Error {
    match error {
        SyncLogRepositoryError::Connection { message } => {
            Error::service_unavailable("Datastore unavailable", message)
        }
        SyncLogRepositoryError::Query { message } => Error::internal(message),
    }
}

fn map_store_error(error: RosterStoreError) -> Error {
    StageFailure::Store(error).into_error()
}

#[async_trait]
impl<Src, Store, Log> SyncStatusQuery for RosterSyncService<Src, Store, Log>
where
    Src: RosterSource,
    Store: RosterStore,
    Log: SyncLogRepository,
{
    async fn status(&self, limit: HistoryLimit) -> Result<SyncStatus, Error> {
        let current_counts = self.store.counts().await.map_err(map_store_error)?;
        let sync_history = self
            .log
            .history(limit.get())
            .await
            .map_err(map_log_error)?;
        Ok(SyncStatus {
            current_counts,
            sync_history,
        })
    }
}

#[cfg(test)]
#[path = "sync_service_tests.rs"]
mod tests;
