//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the sync triggers, the status report and the health
//! probes, together with the bearer-token security scheme checked by
//! [`crate::inbound::http::caller::AuthenticatedCaller`]. Swagger UI serves the
//! document in debug builds.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode, RosterCounts, RowError, RowErrorReason, SyncRun, SyncRunStatus, SyncType};
use crate::inbound::http::status::StatusResponse;
use crate::inbound::http::sync::{
    FullSyncResponse, FullSyncResults, StageResponse, StageSummary, SyncRequestBody,
};

/// Adds the bearer scheme verified against the auth provider.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.description = Some("Access token issued by the platform auth provider.".to_owned());
        components.add_security_scheme("bearer", SecurityScheme::Http(bearer));
    }
}

/// OpenAPI document for the sync service.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Roster sync API",
        description = "Pulls organizations, teams and memberships from the CMS into the platform datastore."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("bearer" = [])),
    paths(
        crate::inbound::http::sync::sync_organizations,
        crate::inbound::http::sync::sync_teams,
        crate::inbound::http::sync::sync_users,
        crate::inbound::http::sync::sync_full,
        crate::inbound::http::status::sync_status,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        SyncRequestBody,
        StageResponse,
        StageSummary,
        FullSyncResults,
        FullSyncResponse,
        StatusResponse,
        RosterCounts,
        RowError,
        RowErrorReason,
        SyncRun,
        SyncRunStatus,
        SyncType,
    )),
    tags(
        (name = "sync", description = "Roster synchronisation triggers and history"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
