//! Builders for the HTTP state ports.

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;

use roster_sync::domain::RosterSyncService;
use roster_sync::domain::ports::{
    FixtureIdentityProvider, FixtureRoleDirectory, FixtureSyncCommand, FixtureSyncStatusQuery,
    IdentityProvider, RoleDirectory, SyncCommand, SyncStatusQuery,
};
use roster_sync::inbound::http::state::HttpState;
use roster_sync::outbound::persistence::{
    DbPool, DieselRoleDirectory, DieselRosterStore, DieselSyncLogRepository,
};
use roster_sync::outbound::roster_source::ExportRosterSource;

use super::ServerConfig;

/// Build the command/query pair from a single service when both the pool and
/// a roster source are available, otherwise fall back to fixtures.
fn build_sync_pair<Pool, Src, S, MakeService>(
    pool: Option<&Pool>,
    source: Option<&Arc<Src>>,
    make_service: MakeService,
) -> (Arc<dyn SyncCommand>, Arc<dyn SyncStatusQuery>)
where
    S: SyncCommand + SyncStatusQuery + 'static,
    MakeService: FnOnce(&Pool, Arc<Src>) -> S,
{
    match (pool, source) {
        (Some(pool), Some(source)) => {
            let service = Arc::new(make_service(pool, Arc::clone(source)));
            let command: Arc<dyn SyncCommand> = service.clone();
            (command, service)
        }
        _ => (Arc::new(FixtureSyncCommand), Arc::new(FixtureSyncStatusQuery)),
    }
}

fn diesel_sync_service(
    pool: &DbPool,
    source: Arc<ExportRosterSource>,
) -> RosterSyncService<ExportRosterSource, DieselRosterStore, DieselSyncLogRepository> {
    RosterSyncService::new(
        source,
        Arc::new(DieselRosterStore::new(pool.clone())),
        Arc::new(DieselSyncLogRepository::new(pool.clone())),
        Arc::new(DefaultClock),
    )
}

fn build_role_directory(pool: Option<&DbPool>) -> Arc<dyn RoleDirectory> {
    match pool {
        Some(pool) => Arc::new(DieselRoleDirectory::new(pool.clone())),
        None => Arc::new(FixtureRoleDirectory),
    }
}

/// Assemble the HTTP state from whatever adapters `config` carries.
pub(super) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let (sync, status) = build_sync_pair(
        config.db_pool.as_ref(),
        config.roster_source.as_ref(),
        diesel_sync_service,
    );
    let identity: Arc<dyn IdentityProvider> = config
        .identity
        .clone()
        .unwrap_or_else(|| Arc::new(FixtureIdentityProvider));
    web::Data::new(HttpState::new(
        sync,
        status,
        identity,
        build_role_directory(config.db_pool.as_ref()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roster_sync::domain::ports::{
        BearerToken, FullSyncReport, FullSyncRequest, HistoryLimit, StageReport, StageRequest,
        SyncStatus,
    };
    use roster_sync::domain::{Error, RosterCounts, StageOutcome};
    use rstest::rstest;

    const STUB_TEAMS: u64 = 7;

    struct StubService;

    #[async_trait]
    impl SyncCommand for StubService {
        async fn run_stage(&self, request: StageRequest) -> Result<StageReport, Error> {
            let mut outcome = StageOutcome::empty(request.kind);
            outcome.created = STUB_TEAMS;
            Ok(StageReport {
                outcome,
                sync_log_id: None,
            })
        }

        async fn run_full(&self, request: FullSyncRequest) -> Result<FullSyncReport, Error> {
            FixtureSyncCommand.run_full(request).await
        }
    }

    #[async_trait]
    impl SyncStatusQuery for StubService {
        async fn status(&self, _limit: HistoryLimit) -> Result<SyncStatus, Error> {
            Ok(SyncStatus {
                current_counts: RosterCounts {
                    teams: STUB_TEAMS,
                    ..RosterCounts::default()
                },
                sync_history: Vec::new(),
            })
        }
    }

    #[rstest]
    #[tokio::test]
    async fn pool_and_source_select_the_real_service() {
        let (command, status) =
            build_sync_pair(Some(&()), Some(&Arc::new(())), |_, _| StubService);

        let report = command
            .run_stage(StageRequest {
                kind: roster_sync::domain::EntityKind::Teams,
                csv_path: None,
            })
            .await
            .expect("stub stage runs");
        assert_eq!(report.outcome.created, STUB_TEAMS);
        let counts = status
            .status(HistoryLimit::default())
            .await
            .expect("stub status");
        assert_eq!(counts.current_counts.teams, STUB_TEAMS);
    }

    #[rstest]
    #[case(None, Some(()))]
    #[case(Some(()), None)]
    #[tokio::test]
    async fn missing_adapters_keep_fixtures(#[case] pool: Option<()>, #[case] source: Option<()>) {
        let source = source.map(Arc::new);
        let (_, status) = build_sync_pair(pool.as_ref(), source.as_ref(), |_, _| StubService);

        let counts = status
            .status(HistoryLimit::default())
            .await
            .expect("fixture status");
        assert_eq!(counts.current_counts, RosterCounts::default());
    }

    #[rstest]
    #[tokio::test]
    async fn unconfigured_identity_rejects_every_token() {
        let config = ServerConfig::new("127.0.0.1:0".parse().expect("address"));
        let state = build_http_state(&config);
        let token = BearerToken::from_header("Bearer anything").expect("token");

        let resolved = state.identity.resolve(&token).await.expect("fixture resolves");
        assert!(resolved.is_none());
    }
}
