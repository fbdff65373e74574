//! Handler tests for the `/api/sync` scope.

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::{ALLOW, AUTHORIZATION};
use actix_web::{App, test};
use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use uuid::Uuid;

use super::*;
use crate::Trace;
use crate::domain::ports::{
    HistoryLimit, MockIdentityProvider, MockRoleDirectory, MockSyncCommand, MockSyncStatusQuery,
    SyncStatus,
};
use crate::domain::{RoleSet, RosterCounts, RowErrorReason, StageOutcome, SyncRun, SyncType, UserId};

const ADMIN_TOKEN: &str = "admin-token";
const MEMBER_TOKEN: &str = "member-token";

struct Harness {
    sync: MockSyncCommand,
    status: MockSyncStatusQuery,
    identity: MockIdentityProvider,
    roles: MockRoleDirectory,
}

#[fixture]
fn harness() -> Harness {
    let admin = UserId::from_uuid(Uuid::from_u128(1));
    let member = UserId::from_uuid(Uuid::from_u128(2));
    let mut identity = MockIdentityProvider::new();
    identity.expect_resolve().returning(move |token| {
        Ok(match token.expose() {
            ADMIN_TOKEN => Some(admin),
            MEMBER_TOKEN => Some(member),
            _ => None,
        })
    });
    let mut roles = MockRoleDirectory::new();
    roles.expect_roles_for().returning(move |user| {
        let names: &[&str] = if *user == admin {
            &["administrator", "coach"]
        } else {
            &["coach"]
        };
        Ok(names.iter().collect::<RoleSet>())
    });
    Harness {
        sync: MockSyncCommand::new(),
        status: MockSyncStatusQuery::new(),
        identity,
        roles,
    }
}

async fn send(
    harness: Harness,
    request: test::TestRequest,
) -> (StatusCode, actix_web::http::header::HeaderMap, Value) {
    let state = web::Data::new(HttpState::new(
        Arc::new(harness.sync),
        Arc::new(harness.status),
        Arc::new(harness.identity),
        Arc::new(harness.roles),
    ));
    let app =
        test::init_service(App::new().app_data(state).wrap(Trace).configure(configure)).await;
    let response = test::call_service(&app, request.to_request()).await;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = test::read_body(response).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, headers, body)
}

fn post(uri: &str, token: Option<&str>) -> test::TestRequest {
    let request = test::TestRequest::post().uri(uri);
    match token {
        Some(token) => request.insert_header((AUTHORIZATION, format!("Bearer {token}"))),
        None => request,
    }
}

fn report(kind: EntityKind, created: u64, updated: u64, errors: Vec<RowError>) -> StageReport {
    StageReport {
        outcome: StageOutcome {
            kind,
            processed: created + updated + 1 + errors.len() as u64,
            created,
            updated,
            unchanged: 1,
            errors,
        },
        sync_log_id: Some(Uuid::from_u128(42)),
    }
}

#[rstest]
#[case("/api/sync/organizations")]
#[case("/api/sync/teams")]
#[case("/api/sync/users")]
#[case("/api/sync/full")]
#[actix_web::test]
async fn anonymous_triggers_are_rejected_without_running(harness: Harness, #[case] uri: &str) {
    let mut harness = harness;
    harness.sync.expect_run_stage().never();
    harness.sync.expect_run_full().never();
    let mut roles = MockRoleDirectory::new();
    roles.expect_roles_for().never();
    harness.roles = roles;

    let (status, headers, body) = send(harness, post(uri, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    assert!(headers.contains_key(crate::domain::TRACE_ID_HEADER));
}

#[rstest]
#[case("/api/sync/organizations")]
#[case("/api/sync/full")]
#[actix_web::test]
async fn non_admins_are_forbidden(harness: Harness, #[case] uri: &str) {
    let mut harness = harness;
    harness.sync.expect_run_stage().never();
    harness.sync.expect_run_full().never();

    let (status, _, body) = send(harness, post(uri, Some(MEMBER_TOKEN))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden - Admin access required");
}

#[rstest]
#[case("/api/sync/organizations")]
#[case("/api/sync/teams")]
#[case("/api/sync/users")]
#[case("/api/sync/full")]
#[actix_web::test]
async fn get_on_a_trigger_is_method_not_allowed(harness: Harness, #[case] uri: &str) {
    let mut harness = harness;
    harness.sync.expect_run_stage().never();
    harness.sync.expect_run_full().never();

    let request = test::TestRequest::get()
        .uri(uri)
        .insert_header((AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}")));
    let (status, headers, _) = send(harness, request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        headers.get(ALLOW).and_then(|value| value.to_str().ok()),
        Some("POST")
    );
}

#[rstest]
#[actix_web::test]
async fn teams_trigger_passes_the_csv_path_through(harness: Harness) {
    let mut harness = harness;
    harness
        .sync
        .expect_run_stage()
        .times(1)
        .withf(|request| {
            request.kind == EntityKind::Teams
                && request.csv_path == Some(PathBuf::from("/exports/teams.csv"))
        })
        .return_once(|_| Ok(report(EntityKind::Teams, 2, 1, Vec::new())));

    let request = post("/api/sync/teams", Some(ADMIN_TOKEN))
        .set_json(json!({ "csvPath": " /exports/teams.csv " }));
    let (status, _, body) = send(harness, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["created"], 2);
    assert_eq!(body["updated"], 1);
    assert_eq!(body["unchanged"], 1);
    assert_eq!(body["errors"], json!([]));
    assert_eq!(body["syncLogId"], Uuid::from_u128(42).to_string());
}

#[rstest]
#[actix_web::test]
async fn an_empty_body_reads_from_the_cms(harness: Harness) {
    let mut harness = harness;
    harness
        .sync
        .expect_run_stage()
        .times(1)
        .withf(|request| request.kind == EntityKind::Memberships && request.csv_path.is_none())
        .return_once(|_| {
            Ok(report(
                EntityKind::Memberships,
                0,
                0,
                vec![RowError::new(
                    None,
                    RowErrorReason::UnknownUser,
                    "no user with email ada@example.com",
                )],
            ))
        });

    let (status, _, body) = send(harness, post("/api/sync/users", Some(ADMIN_TOKEN))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"][0]["reason"], "UnknownUser");
}

#[rstest]
#[actix_web::test]
async fn malformed_json_is_a_bad_request(harness: Harness) {
    let mut harness = harness;
    harness.sync.expect_run_stage().never();

    let request = post("/api/sync/organizations", Some(ADMIN_TOKEN))
        .insert_header((actix_web::http::header::CONTENT_TYPE, "application/json"))
        .set_payload("{\"csvPath\":");
    let (status, _, body) = send(harness, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[rstest]
#[actix_web::test]
async fn unreachable_source_is_service_unavailable(harness: Harness) {
    let mut harness = harness;
    harness.sync.expect_run_stage().return_once(|_| {
        Err(Error::service_unavailable(
            "Source unavailable",
            "CMS API returned 502 Bad Gateway",
        ))
    });

    let (status, _, body) =
        send(harness, post("/api/sync/organizations", Some(ADMIN_TOKEN))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Source unavailable");
    assert_eq!(body["message"], "CMS API returned 502 Bad Gateway");
}

#[rstest]
#[actix_web::test]
async fn internal_failures_are_redacted(harness: Harness) {
    let mut harness = harness;
    harness
        .sync
        .expect_run_stage()
        .return_once(|_| Err(Error::internal("duplicate key value violates teams_pkey")));

    let (status, _, body) = send(harness, post("/api/sync/teams", Some(ADMIN_TOKEN))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
    assert!(body["traceId"].is_string());
}

#[rstest]
#[actix_web::test]
async fn full_run_reports_a_halted_chain(harness: Harness) {
    let mut harness = harness;
    harness
        .sync
        .expect_run_full()
        .times(1)
        .withf(|request| {
            request.csv_path == Some(PathBuf::from("/exports/teams.csv"))
                && request.organizations_csv_path.is_none()
        })
        .return_once(|_| {
            Ok(FullSyncReport {
                organizations: StageResult::Completed(report(
                    EntityKind::Organizations,
                    1,
                    0,
                    Vec::new(),
                )),
                teams: StageResult::Failed {
                    message: "could not read /exports/teams.csv".to_owned(),
                    sync_log_id: Some(Uuid::from_u128(7)),
                },
                users: StageResult::Skipped,
                sync_log_id: Some(Uuid::from_u128(8)),
            })
        });

    let request = post("/api/sync/full", Some(ADMIN_TOKEN))
        .set_json(json!({ "csvPath": "/exports/teams.csv" }));
    let (status, _, body) = send(harness, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    let results = &body["results"];
    assert_eq!(results["organizations"]["success"], true);
    assert_eq!(results["organizations"]["skipped"], false);
    assert_eq!(results["teams"]["success"], false);
    assert_eq!(results["teams"]["message"], "could not read /exports/teams.csv");
    assert_eq!(results["users"]["skipped"], true);
    assert!(results["users"].get("message").is_none());
    assert_eq!(body["syncLogId"], Uuid::from_u128(8).to_string());
}

fn history_entry() -> SyncRun {
    let at = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).single().expect("valid time");
    SyncRun::aborted(SyncType::Teams, "CMS API returned 503", at, at)
}

#[rstest]
#[actix_web::test]
async fn status_reports_counts_and_history(harness: Harness) {
    let mut harness = harness;
    harness
        .status
        .expect_status()
        .times(1)
        .withf(|limit| limit.get() == 5)
        .return_once(|_| {
            Ok(SyncStatus {
                current_counts: RosterCounts {
                    organizations: 3,
                    teams: 12,
                    team_memberships: 140,
                },
                sync_history: vec![history_entry()],
            })
        });

    let request = test::TestRequest::get()
        .uri("/api/sync/status?limit=5")
        .insert_header((AUTHORIZATION, format!("Bearer {MEMBER_TOKEN}")));
    let (status, _, body) = send(harness, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentCounts"]["teamMemberships"], 140);
    assert_eq!(body["syncHistory"][0]["syncType"], "teams");
    assert_eq!(body["syncHistory"][0]["status"], "failed");
}

#[rstest]
#[case("0")]
#[case("101")]
#[case("lots")]
#[actix_web::test]
async fn status_rejects_out_of_range_limits(harness: Harness, #[case] limit: &str) {
    let mut harness = harness;
    harness.status.expect_status().never();

    let request = test::TestRequest::get()
        .uri(&format!("/api/sync/status?limit={limit}"))
        .insert_header((AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}")));
    let (status, _, body) = send(harness, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "limit");
}

#[rstest]
#[actix_web::test]
async fn status_defaults_to_ten_entries(harness: Harness) {
    let mut harness = harness;
    harness
        .status
        .expect_status()
        .times(1)
        .withf(|limit| *limit == HistoryLimit::default())
        .return_once(|_| Ok(SyncStatus::default()));

    let request = test::TestRequest::get()
        .uri("/api/sync/status")
        .insert_header((AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}")));
    let (status, _, _) = send(harness, request).await;

    assert_eq!(status, StatusCode::OK);
}
