//! PostgreSQL-backed sync run log.
//!
//! Rows are inserted once and never updated. History is ordered by the
//! insertion sequence, so a full run's combined record, written after its
//! stages, is the newest entry even though it started first.

use async_trait::async_trait;
use diesel::dsl::Desc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{SyncLogRepository, SyncLogRepositoryError};
use crate::domain::{RowError, SyncRun, SyncRunStatus, SyncType};

use super::diesel_helpers::{count_for_db, count_from_db, map_basic_diesel_error, pool_error_message};
use super::models::{NewSyncRunRow, SyncRunRow};
use super::pool::{DbPool, PoolError};
use super::schema::sync_runs;

/// Diesel-backed implementation of the [`SyncLogRepository`] port.
#[derive(Clone)]
pub struct DieselSyncLogRepository {
    pool: DbPool,
}

impl DieselSyncLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> SyncLogRepositoryError {
    SyncLogRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> SyncLogRepositoryError {
    map_basic_diesel_error(
        error,
        SyncLogRepositoryError::query,
        SyncLogRepositoryError::connection,
    )
}

fn row_to_sync_run(row: SyncRunRow) -> Result<SyncRun, SyncLogRepositoryError> {
    let sync_type = SyncType::parse(&row.sync_type).ok_or_else(|| {
        SyncLogRepositoryError::query(format!("unknown sync type {:?}", row.sync_type))
    })?;
    let status = SyncRunStatus::parse(&row.status).ok_or_else(|| {
        SyncLogRepositoryError::query(format!("unknown sync status {:?}", row.status))
    })?;
    let errors: Vec<RowError> = serde_json::from_value(row.errors).map_err(|error| {
        SyncLogRepositoryError::query(format!("sync run {} has unreadable errors: {error}", row.id))
    })?;
    Ok(SyncRun {
        id: row.id,
        sync_type,
        status,
        records_processed: count_from_db(row.records_processed),
        records_created: count_from_db(row.records_created),
        records_updated: count_from_db(row.records_updated),
        errors,
        error_message: row.error_message,
        metadata: row.metadata,
        started_at: row.started_at,
        finished_at: row.finished_at,
    })
}

fn new_row(run: &SyncRun) -> Result<NewSyncRunRow<'_>, SyncLogRepositoryError> {
    let errors = serde_json::to_value(&run.errors)
        .map_err(|error| SyncLogRepositoryError::query(format!("encode row errors: {error}")))?;
    Ok(NewSyncRunRow {
        id: run.id,
        sync_type: run.sync_type.as_str(),
        status: run.status.as_str(),
        records_processed: count_for_db(run.records_processed),
        records_created: count_for_db(run.records_created),
        records_updated: count_for_db(run.records_updated),
        errors,
        error_message: run.error_message.as_deref(),
        metadata: run.metadata.as_ref(),
        started_at: run.started_at,
        finished_at: run.finished_at,
    })
}

/// Newest recorded first.
fn history_order() -> Desc<sync_runs::recorded_seq> {
    sync_runs::recorded_seq.desc()
}

#[async_trait]
impl SyncLogRepository for DieselSyncLogRepository {
    async fn record(&self, run: &SyncRun) -> Result<(), SyncLogRepositoryError> {
        let row = new_row(run)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(sync_runs::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn history(&self, limit: u32) -> Result<Vec<SyncRun>, SyncLogRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<SyncRunRow> = sync_runs::table
            .select(SyncRunRow::as_select())
            .order_by(history_order())
            .limit(i64::from(limit))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_sync_run).collect()
    }
}
