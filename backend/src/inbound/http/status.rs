//! Sync status handler.

use actix_web::web;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::HistoryLimit;
use crate::domain::{Error, Permission, RosterCounts, SyncRun, auth::authorize};
use crate::inbound::http::ApiResult;
use crate::inbound::http::caller::AuthenticatedCaller;
use crate::inbound::http::state::HttpState;

/// Query string for `GET /api/sync/status`.
///
/// `limit` is kept as text so out-of-range and non-numeric values both
/// surface as the same validation error.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// History entries to return, 1 to 100. Defaults to 10.
    #[param(value_type = Option<u32>, example = 10)]
    pub limit: Option<String>,
}

/// Current totals plus the most recent runs, newest first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub current_counts: RosterCounts,
    pub sync_history: Vec<SyncRun>,
}

#[utoipa::path(
    get,
    path = "/api/sync/status",
    params(StatusQuery),
    responses(
        (status = 200, description = "Current counts and sync history", body = StatusResponse),
        (status = 400, description = "Invalid limit", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 503, description = "Datastore unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["sync"],
    operation_id = "syncStatus",
    security(("bearer" = []))
)]
pub async fn sync_status(
    state: web::Data<HttpState>,
    caller: AuthenticatedCaller,
    query: web::Query<StatusQuery>,
) -> ApiResult<web::Json<StatusResponse>> {
    authorize(caller.caller(), Permission::ViewSyncStatus)?;
    let limit = HistoryLimit::parse(query.limit.as_deref()).map_err(|err| {
        Error::invalid_request(err.to_string())
            .with_details(serde_json::json!({ "field": "limit" }))
    })?;
    let status = state.status.status(limit).await?;
    Ok(web::Json(StatusResponse {
        current_counts: status.current_counts,
        sync_history: status.sync_history,
    }))
}
