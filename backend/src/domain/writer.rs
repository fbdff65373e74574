//! Applies a [`ReconcilePlan`] to the roster store.
//!
//! Creates go in one batch; if the batch is rejected the rows are retried one
//! at a time so only the offending rows are reported. Updates are applied
//! individually. Only connection loss stops the stage.

use tracing::{debug, warn};

use super::ports::{RosterStore, RosterStoreError};
use super::reconcile::ReconcilePlan;
use super::roster::{EntityKind, RowDraft};
use super::sync_run::{RowError, RowErrorReason};

/// Counts and row failures from applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub created: u64,
    pub updated: u64,
    pub errors: Vec<RowError>,
}

/// Writes one entity type at a time.
pub struct StageWriter<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> StageWriter<'a, S>
where
    S: RosterStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Apply `plan` for `kind`.
    ///
    /// Returns `Err` only for unrecoverable (connection) failures.
    pub async fn apply(
        &self,
        kind: EntityKind,
        plan: &ReconcilePlan,
    ) -> Result<WriteOutcome, RosterStoreError> {
        let mut outcome = WriteOutcome::default();
        self.create_rows(kind, &plan.to_create, &mut outcome)
            .await?;

        for update in &plan.to_update {
            match self.store.update_row(kind, update.id, &update.draft).await {
                Ok(()) => outcome.updated += 1,
                Err(error) if error.is_unrecoverable() => return Err(error),
                Err(error) => outcome.errors.push(row_failure(kind, &update.draft, &error)),
            }
        }
        Ok(outcome)
    }

    async fn create_rows(
        &self,
        kind: EntityKind,
        rows: &[RowDraft],
        outcome: &mut WriteOutcome,
    ) -> Result<(), RosterStoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        match self.store.insert_batch(kind, rows).await {
            Ok(inserted) => {
                outcome.created += inserted;
                return Ok(());
            }
            Err(error) if error.is_unrecoverable() => return Err(error),
            Err(error) => {
                debug!(%kind, %error, rows = rows.len(), "batch insert rejected; retrying row by row");
            }
        }

        for row in rows {
            match self.store.insert_row(kind, row).await {
                Ok(()) => outcome.created += 1,
                Err(error) if error.is_unrecoverable() => return Err(error),
                Err(error) => outcome.errors.push(row_failure(kind, row, &error)),
            }
        }
        Ok(())
    }
}

fn row_failure(kind: EntityKind, row: &RowDraft, error: &RosterStoreError) -> RowError {
    warn!(%kind, external_id = %row.external_id, %error, "row write failed");
    RowError::new(
        Some(&row.external_id),
        RowErrorReason::WriterRowFailure,
        error.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExternalId;
    use crate::domain::ports::MockRosterStore;
    use crate::domain::reconcile::PlannedUpdate;
    use crate::domain::roster::{ExtraFields, RowLinks};
    use rstest::rstest;
    use uuid::Uuid;

    fn draft(external_id: &str) -> RowDraft {
        RowDraft {
            external_id: ExternalId::new(external_id).expect("valid id"),
            name: format!("Org {external_id}"),
            links: RowLinks::Root,
            extra: ExtraFields::new(),
        }
    }

    fn plan(creates: &[&str], updates: &[&str]) -> ReconcilePlan {
        ReconcilePlan {
            to_create: creates.iter().map(|id| draft(id)).collect(),
            to_update: updates
                .iter()
                .map(|id| PlannedUpdate {
                    id: Uuid::new_v4(),
                    draft: draft(id),
                })
                .collect(),
            ..ReconcilePlan::default()
        }
    }

    #[rstest]
    #[tokio::test]
    async fn batch_insert_counts_created_rows() {
        let mut store = MockRosterStore::new();
        store
            .expect_insert_batch()
            .times(1)
            .withf(|kind, rows| *kind == EntityKind::Organizations && rows.len() == 3)
            .return_once(|_, _| Ok(3));
        store.expect_insert_row().never();

        let outcome = StageWriter::new(&store)
            .apply(EntityKind::Organizations, &plan(&["a", "b", "c"], &[]))
            .await
            .expect("write succeeds");
        assert_eq!(outcome.created, 3);
        assert!(outcome.errors.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn one_conflicting_row_is_isolated() {
        let mut store = MockRosterStore::new();
        store
            .expect_insert_batch()
            .times(1)
            .return_once(|_, _| Err(RosterStoreError::constraint("duplicate key value")));
        store
            .expect_insert_row()
            .times(4)
            .returning(|_, row| {
                if row.external_id.as_str() == "c" {
                    Err(RosterStoreError::constraint("duplicate key value"))
                } else {
                    Ok(())
                }
            });

        let outcome = StageWriter::new(&store)
            .apply(EntityKind::Organizations, &plan(&["a", "b", "c", "d"], &[]))
            .await
            .expect("row failures are contained");
        assert_eq!(outcome.created, 3);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].external_id.as_deref(), Some("c"));
        assert_eq!(outcome.errors[0].reason, RowErrorReason::WriterRowFailure);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_update_does_not_stop_the_rest() {
        let mut store = MockRosterStore::new();
        store.expect_insert_batch().never();
        store
            .expect_update_row()
            .times(3)
            .returning(|_, _, row| {
                if row.external_id.as_str() == "b" {
                    Err(RosterStoreError::query("value too long"))
                } else {
                    Ok(())
                }
            });

        let outcome = StageWriter::new(&store)
            .apply(EntityKind::Organizations, &plan(&[], &["a", "b", "c"]))
            .await
            .expect("row failures are contained");
        assert_eq!(outcome.updated, 2);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn connection_loss_aborts_the_stage() {
        let mut store = MockRosterStore::new();
        store
            .expect_insert_batch()
            .times(1)
            .return_once(|_, _| Err(RosterStoreError::connection("pool timed out")));
        store.expect_insert_row().never();
        store.expect_update_row().never();

        let error = StageWriter::new(&store)
            .apply(EntityKind::Organizations, &plan(&["a"], &["b"]))
            .await
            .expect_err("connection loss is fatal");
        assert!(error.is_unrecoverable());
    }

    #[rstest]
    #[tokio::test]
    async fn empty_plan_touches_nothing() {
        let mut store = MockRosterStore::new();
        store.expect_insert_batch().never();
        store.expect_update_row().never();

        let outcome = StageWriter::new(&store)
            .apply(EntityKind::Teams, &ReconcilePlan::default())
            .await
            .expect("nothing to do");
        assert_eq!(outcome, WriteOutcome::default());
    }
}
