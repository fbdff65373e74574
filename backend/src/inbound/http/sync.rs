//! Sync trigger handlers.
//!
//! ```text
//! POST /api/sync/organizations {"csvPath":"/exports/organizations.csv"}
//! POST /api/sync/teams
//! POST /api/sync/users
//! POST /api/sync/full {"csvPath":"/exports/teams.csv"}
//! GET  /api/sync/status?limit=10
//! ```
//!
//! Every trigger requires the administrator role. Any other method on a
//! trigger route answers 405 with `Allow: POST`.

use std::path::PathBuf;

use actix_web::{FromRequest, Handler, Responder, Resource, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::ports::{FullSyncReport, FullSyncRequest, StageReport, StageRequest, StageResult};
use crate::domain::{EntityKind, Error, Permission, RowError, auth::authorize};
use crate::inbound::http::ApiResult;
use crate::inbound::http::caller::AuthenticatedCaller;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::status::sync_status;

/// Optional body accepted by every trigger.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequestBody {
    /// CSV export to read instead of the CMS API.
    #[schema(example = "/exports/teams.csv")]
    pub csv_path: Option<String>,
    /// Organization export for full runs.
    pub organizations_csv_path: Option<String>,
}

/// Result of a single-stage trigger.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageResponse {
    pub success: bool,
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub errors: Vec<RowError>,
    pub sync_log_id: Option<Uuid>,
}

impl From<StageReport> for StageResponse {
    fn from(report: StageReport) -> Self {
        let success = report.outcome.success();
        let outcome = report.outcome;
        Self {
            success,
            processed: outcome.processed,
            created: outcome.created,
            updated: outcome.updated,
            unchanged: outcome.unchanged,
            errors: outcome.errors,
            sync_log_id: report.sync_log_id,
        }
    }
}

/// One stage inside a full run.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub success: bool,
    /// An earlier stage aborted so this one never ran.
    pub skipped: bool,
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub errors: Vec<RowError>,
    /// Why the stage aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub sync_log_id: Option<Uuid>,
}

impl From<StageResult> for StageSummary {
    fn from(result: StageResult) -> Self {
        match result {
            StageResult::Completed(report) => {
                let response = StageResponse::from(report);
                Self {
                    success: response.success,
                    skipped: false,
                    created: response.created,
                    updated: response.updated,
                    unchanged: response.unchanged,
                    errors: response.errors,
                    message: None,
                    sync_log_id: response.sync_log_id,
                }
            }
            StageResult::Failed {
                message,
                sync_log_id,
            } => Self {
                message: Some(message),
                sync_log_id,
                ..Self::default()
            },
            StageResult::Skipped => Self {
                skipped: true,
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FullSyncResults {
    pub organizations: StageSummary,
    pub teams: StageSummary,
    pub users: StageSummary,
}

/// Result of `POST /api/sync/full`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FullSyncResponse {
    pub success: bool,
    pub results: FullSyncResults,
    /// Id of the combined `full` sync-log entry.
    pub sync_log_id: Option<Uuid>,
}

impl From<FullSyncReport> for FullSyncResponse {
    fn from(report: FullSyncReport) -> Self {
        let success = report.success();
        Self {
            success,
            results: FullSyncResults {
                organizations: report.organizations.into(),
                teams: report.teams.into(),
                users: report.users.into(),
            },
            sync_log_id: report.sync_log_id,
        }
    }
}

/// An empty body means "use the CMS API".
fn parse_body(body: &[u8]) -> Result<SyncRequestBody, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SyncRequestBody::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| Error::invalid_request(format!("request body is not valid JSON: {err}")))
}

fn csv_path(raw: Option<String>) -> Option<PathBuf> {
    raw.map(|path| path.trim().to_owned())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

async fn run_stage(
    state: &HttpState,
    caller: &AuthenticatedCaller,
    body: &[u8],
    kind: EntityKind,
) -> ApiResult<web::Json<StageResponse>> {
    authorize(caller.caller(), Permission::RunSync)?;
    let body = parse_body(body)?;
    let report = state
        .sync
        .run_stage(StageRequest {
            kind,
            csv_path: csv_path(body.csv_path),
        })
        .await?;
    Ok(web::Json(report.into()))
}

/// Sync organizations from the CMS API or a CSV export.
#[utoipa::path(
    post,
    path = "/api/sync/organizations",
    request_body(content = SyncRequestBody, description = "Optional; omit to read the CMS API"),
    responses(
        (status = 200, description = "Stage finished", body = StageResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 405, description = "Method not allowed", body = Error),
        (status = 503, description = "Source unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["sync"],
    operation_id = "syncOrganizations",
    security(("bearer" = []))
)]
pub async fn sync_organizations(
    state: web::Data<HttpState>,
    caller: AuthenticatedCaller,
    body: web::Bytes,
) -> ApiResult<web::Json<StageResponse>> {
    run_stage(&state, &caller, &body, EntityKind::Organizations).await
}

/// Sync teams and link them to their organizations.
#[utoipa::path(
    post,
    path = "/api/sync/teams",
    request_body(content = SyncRequestBody, description = "Optional; omit to read the CMS API"),
    responses(
        (status = 200, description = "Stage finished", body = StageResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 405, description = "Method not allowed", body = Error),
        (status = 503, description = "Source unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["sync"],
    operation_id = "syncTeams",
    security(("bearer" = []))
)]
pub async fn sync_teams(
    state: web::Data<HttpState>,
    caller: AuthenticatedCaller,
    body: web::Bytes,
) -> ApiResult<web::Json<StageResponse>> {
    run_stage(&state, &caller, &body, EntityKind::Teams).await
}

/// Sync team memberships for existing users.
#[utoipa::path(
    post,
    path = "/api/sync/users",
    request_body(content = SyncRequestBody, description = "Optional; omit to read the CMS API"),
    responses(
        (status = 200, description = "Stage finished", body = StageResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 405, description = "Method not allowed", body = Error),
        (status = 503, description = "Source unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["sync"],
    operation_id = "syncUsers",
    security(("bearer" = []))
)]
pub async fn sync_users(
    state: web::Data<HttpState>,
    caller: AuthenticatedCaller,
    body: web::Bytes,
) -> ApiResult<web::Json<StageResponse>> {
    run_stage(&state, &caller, &body, EntityKind::Memberships).await
}

/// Run organizations, teams and memberships in order.
///
/// A stage that cannot read its source halts the run; the response is still
/// 200 with `success: false` and later stages marked `skipped`.
#[utoipa::path(
    post,
    path = "/api/sync/full",
    request_body(content = SyncRequestBody, description = "Optional; omit to read the CMS API"),
    responses(
        (status = 200, description = "Run finished", body = FullSyncResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 405, description = "Method not allowed", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["sync"],
    operation_id = "syncFull",
    security(("bearer" = []))
)]
pub async fn sync_full(
    state: web::Data<HttpState>,
    caller: AuthenticatedCaller,
    body: web::Bytes,
) -> ApiResult<web::Json<FullSyncResponse>> {
    authorize(caller.caller(), Permission::RunSync)?;
    let body = parse_body(&body)?;
    let report = state
        .sync
        .run_full(FullSyncRequest {
            csv_path: csv_path(body.csv_path),
            organizations_csv_path: csv_path(body.organizations_csv_path),
        })
        .await?;
    Ok(web::Json(report.into()))
}

/// Fallback for trigger routes hit with anything but POST.
pub async fn method_not_allowed() -> ApiResult<web::Json<()>> {
    Err(Error::method_not_allowed())
}

fn trigger<F, Args>(path: &str, handler: F) -> Resource
where
    F: Handler<Args>,
    Args: FromRequest + 'static,
    F::Output: Responder + 'static,
{
    web::resource(path)
        .route(web::post().to(handler))
        .default_service(web::to(method_not_allowed))
}

/// Register the `/api/sync` scope.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use roster_sync::inbound::http::sync::configure;
///
/// let _app = App::new().configure(configure);
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/sync")
            .service(trigger("/organizations", sync_organizations))
            .service(trigger("/teams", sync_teams))
            .service(trigger("/users", sync_users))
            .service(trigger("/full", sync_full))
            .service(web::resource("/status").route(web::get().to(sync_status))),
    );
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
