//! Run one sync stage, or the full pipeline, against the configured datastore.
//!
//! ```text
//! sync-once teams --csv-path /exports/teams.csv
//! sync-once full --organizations-csv-path /exports/orgs.csv --csv-path /exports/teams.csv
//! ```
//!
//! Connection settings come from the same `ROSTER_SYNC_*` environment as the
//! server. The outcome is written to stdout as JSON.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use mockable::DefaultClock;
use ortho_config::OrthoConfig as _;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use roster_sync::domain::ports::{FullSyncRequest, StageRequest, SyncCommand};
use roster_sync::domain::{EntityKind, RosterSyncService};
use roster_sync::inbound::http::sync::{FullSyncResponse, StageResponse};
use roster_sync::outbound::persistence::{
    DbPool, DieselRosterStore, DieselSyncLogRepository, PoolConfig, apply_migrations,
};
use roster_sync::outbound::roster_source::ExportRosterSource;
use roster_sync::settings::SyncSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stage {
    Organizations,
    Teams,
    /// Team memberships.
    Users,
    /// Organizations, teams and memberships in order.
    Full,
}

impl Stage {
    fn entity_kind(self) -> Option<EntityKind> {
        match self {
            Self::Organizations => Some(EntityKind::Organizations),
            Self::Teams => Some(EntityKind::Teams),
            Self::Users => Some(EntityKind::Memberships),
            Self::Full => None,
        }
    }
}

/// `sync-once` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sync-once",
    about = "Synchronise CMS organizations, teams and memberships once",
    version
)]
struct CliArgs {
    #[arg(value_enum)]
    stage: Stage,
    /// CSV export to read instead of the CMS API. For `full`, the team export.
    #[arg(long = "csv-path", value_name = "path")]
    csv_path: Option<PathBuf>,
    /// Organization export used by `full`.
    #[arg(long = "organizations-csv-path", value_name = "path")]
    organizations_csv_path: Option<PathBuf>,
    /// Database connection URL. Falls back to `ROSTER_SYNC_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
    /// Skip applying pending migrations first.
    #[arg(long = "skip-migrations")]
    skip_migrations: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to create Tokio runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: CliArgs) -> Result<()> {
    let settings = SyncSettings::load_from_iter([OsString::from("sync-once")])
        .wrap_err("failed to load settings")?;
    let database_url = match args.database_url {
        Some(url) => url,
        None => settings.database_url()?.to_owned(),
    };
    if !args.skip_migrations {
        let applied = apply_migrations(database_url.clone())
            .await
            .wrap_err("failed to apply migrations")?;
        info!(applied, "datastore migrated");
    }

    let pool = DbPool::new(PoolConfig::new(database_url).with_max_size(settings.max_pool_size()))
        .await
        .wrap_err("failed to build connection pool")?;
    let service = RosterSyncService::new(
        Arc::new(ExportRosterSource::from_settings(&settings)?),
        Arc::new(DieselRosterStore::new(pool.clone())),
        Arc::new(DieselSyncLogRepository::new(pool)),
        Arc::new(DefaultClock),
    );

    let (success, rendered) = match args.stage.entity_kind() {
        Some(kind) => {
            let report = service
                .run_stage(StageRequest {
                    kind,
                    csv_path: args.csv_path,
                })
                .await?;
            let response = StageResponse::from(report);
            (response.success, serde_json::to_string_pretty(&response)?)
        }
        None => {
            let report = service
                .run_full(FullSyncRequest {
                    csv_path: args.csv_path,
                    organizations_csv_path: args.organizations_csv_path,
                })
                .await?;
            let response = FullSyncResponse::from(report);
            (response.success, serde_json::to_string_pretty(&response)?)
        }
    };

    info!(stage = ?args.stage, success, "sync finished");
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}").wrap_err("failed to write outcome")?;
    Ok(())
}
