//! End-to-end pipeline behaviour over CSV exports and in-memory stores.

use std::sync::Arc;

use mockable::DefaultClock;
use roster_sync::domain::ports::{
    FullSyncReport, FullSyncRequest, HistoryLimit, StageReport, StageRequest, StageResult,
    SyncCommand, SyncStatusQuery,
};
use roster_sync::domain::source_rows::NormaliseOptions;
use roster_sync::domain::{
    EntityKind, ExternalId, RosterSyncService, RowErrorReason, SyncRunStatus, SyncType,
};
use roster_sync::outbound::csv_export::CsvExportReader;
use roster_sync::outbound::roster_source::ExportRosterSource;
use rstest::{fixture, rstest};

mod support;

use support::{Exports, InMemoryRosterStore, RecordingSyncLog, platform_users};

type Service = RosterSyncService<ExportRosterSource, InMemoryRosterStore, RecordingSyncLog>;

struct Pipeline {
    service: Service,
    store: Arc<InMemoryRosterStore>,
    log: Arc<RecordingSyncLog>,
    exports: Exports,
}

fn pipeline_with(options: NormaliseOptions) -> Pipeline {
    let store = Arc::new(InMemoryRosterStore::with_users(platform_users()));
    let log = Arc::new(RecordingSyncLog::default());
    let source = Arc::new(ExportRosterSource::new(CsvExportReader::new(options), None));
    Pipeline {
        service: RosterSyncService::new(
            source,
            Arc::clone(&store),
            Arc::clone(&log),
            Arc::new(DefaultClock),
        ),
        store,
        log,
        exports: Exports::new(),
    }
}

#[fixture]
fn pipeline() -> Pipeline {
    pipeline_with(NormaliseOptions::default())
}

fn completed(result: &StageResult) -> &StageReport {
    match result {
        StageResult::Completed(report) => report,
        other => panic!("expected a completed stage, got {other:?}"),
    }
}

async fn full_run(pipeline: &Pipeline, lakeside_name: &str) -> FullSyncReport {
    let request = FullSyncRequest {
        organizations_csv_path: Some(pipeline.exports.organizations(lakeside_name)),
        csv_path: Some(pipeline.exports.teams()),
    };
    pipeline.service.run_full(request).await.expect("full run")
}

#[rstest]
#[tokio::test]
async fn a_second_identical_run_writes_nothing(pipeline: Pipeline) {
    let first = full_run(&pipeline, "Lakeside United").await;
    assert_eq!(completed(&first.organizations).outcome.created, 2);
    assert_eq!(completed(&first.teams).outcome.created, 2);
    assert_eq!(completed(&first.users).outcome.created, 2);
    let writes_after_first = pipeline.store.writes();

    let second = full_run(&pipeline, "Lakeside United").await;
    for stage in [&second.organizations, &second.teams, &second.users] {
        let outcome = &completed(stage).outcome;
        assert_eq!((outcome.created, outcome.updated), (0, 0), "{:?}", outcome.kind);
    }
    assert_eq!(completed(&second.organizations).outcome.unchanged, 2);
    assert_eq!(pipeline.store.writes(), writes_after_first);
}

#[rstest]
#[tokio::test]
async fn renaming_an_organization_updates_it_in_place(pipeline: Pipeline) {
    full_run(&pipeline, "Lakeside United").await;
    let original_id = pipeline
        .store
        .rows(EntityKind::Organizations)
        .iter()
        .find(|row| row.name == "Lakeside United")
        .map(|row| row.id)
        .expect("Lakeside stored");

    let report = full_run(&pipeline, "Lakeside Athletic").await;

    let organizations = &completed(&report.organizations).outcome;
    assert_eq!(organizations.created, 0);
    assert_eq!(organizations.updated, 1);
    assert_eq!(organizations.unchanged, 1);
    let rows = pipeline.store.rows(EntityKind::Organizations);
    assert_eq!(rows.len(), 2);
    let renamed = rows
        .iter()
        .find(|row| row.id == original_id)
        .expect("same row kept");
    assert_eq!(renamed.name, "Lakeside Athletic");
}

#[rstest]
#[tokio::test]
async fn unknown_members_are_reported_without_failing_the_run(pipeline: Pipeline) {
    let report = full_run(&pipeline, "Lakeside United").await;

    let users = &completed(&report.users).outcome;
    assert_eq!(users.created, 2);
    assert_eq!(users.errors.len(), 1);
    assert_eq!(users.errors[0].reason, RowErrorReason::UnknownUser);
    assert!(!report.success());
    assert!(completed(&report.teams).outcome.success());
}

#[rstest]
#[tokio::test]
async fn teams_before_organizations_are_orphaned(pipeline: Pipeline) {
    let report = pipeline
        .service
        .run_stage(StageRequest {
            kind: EntityKind::Teams,
            csv_path: Some(pipeline.exports.teams()),
        })
        .await
        .expect("stage runs");

    assert_eq!(report.outcome.created, 0);
    assert_eq!(report.outcome.errors.len(), 2);
    assert!(
        report
            .outcome
            .errors
            .iter()
            .all(|error| error.reason == RowErrorReason::OrphanedParent)
    );
    assert!(pipeline.store.rows(EntityKind::Teams).is_empty());
}

#[rstest]
#[tokio::test]
async fn parentless_teams_fall_back_to_the_default_organization() {
    let pipeline = pipeline_with(NormaliseOptions {
        default_organization: Some(ExternalId::new("org-1").expect("valid id")),
    });
    let organizations = pipeline.exports.organizations("Lakeside United");
    let teams = pipeline.exports.write("teams.csv", "ID,Title\nteam-9,Unassigned U8\n");

    for (kind, path) in [
        (EntityKind::Organizations, organizations),
        (EntityKind::Teams, teams),
    ] {
        pipeline
            .service
            .run_stage(StageRequest {
                kind,
                csv_path: Some(path),
            })
            .await
            .expect("stage runs");
    }

    assert_eq!(pipeline.store.rows(EntityKind::Teams).len(), 1);
}

#[rstest]
#[tokio::test]
async fn a_missing_export_halts_the_chain(pipeline: Pipeline) {
    let request = FullSyncRequest {
        organizations_csv_path: Some(pipeline.exports.organizations("Lakeside United")),
        csv_path: Some(pipeline.exports.path("absent.csv")),
    };

    let report = pipeline.service.run_full(request).await.expect("full run");

    assert!(completed(&report.organizations).outcome.success());
    assert!(matches!(report.teams, StageResult::Failed { .. }));
    assert_eq!(report.users, StageResult::Skipped);
    assert!(!report.success());
    let failed = pipeline
        .log
        .runs()
        .into_iter()
        .find(|run| run.sync_type == SyncType::Teams)
        .expect("failed stage recorded");
    assert_eq!(failed.status, SyncRunStatus::Failed);
    assert!(failed.error_message.is_some());
}

#[rstest]
#[tokio::test]
async fn status_reports_counts_and_newest_runs_first(pipeline: Pipeline) {
    full_run(&pipeline, "Lakeside United").await;

    let status = pipeline
        .service
        .status(HistoryLimit::parse(Some("2")).expect("valid limit"))
        .await
        .expect("status");

    assert_eq!(status.current_counts.organizations, 2);
    assert_eq!(status.current_counts.teams, 2);
    assert_eq!(status.current_counts.team_memberships, 2);
    assert_eq!(status.sync_history.len(), 2);
    assert_eq!(status.sync_history[0].sync_type, SyncType::Full);
    assert_eq!(status.sync_history[1].sync_type, SyncType::Users);
}
