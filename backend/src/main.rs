//! Service entry-point: loads settings, migrates the datastore and serves the
//! sync API.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use ortho_config::OrthoConfig as _;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use roster_sync::inbound::http::health::HealthState;
use roster_sync::outbound::identity::AuthHttpIdentityProvider;
use roster_sync::outbound::persistence::{DbPool, PoolConfig, apply_migrations};
use roster_sync::outbound::roster_source::ExportRosterSource;
use roster_sync::settings::SyncSettings;
use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = SyncSettings::load_from_iter(std::env::args_os())
        .wrap_err("failed to load settings")?;
    info!(settings = ?settings, "configuration loaded");

    let database_url = settings.database_url()?.to_owned();
    let applied = apply_migrations(database_url.clone())
        .await
        .wrap_err("failed to apply migrations")?;
    info!(applied, "datastore migrated");

    let pool = DbPool::new(PoolConfig::new(database_url).with_max_size(settings.max_pool_size()))
        .await
        .wrap_err("failed to build connection pool")?;
    let identity = AuthHttpIdentityProvider::new(
        &settings.auth_base_url()?,
        settings.auth_api_key(),
        settings.auth_timeout(),
    )?;
    let source = ExportRosterSource::from_settings(&settings)?;

    let config = ServerConfig::new(settings.bind_addr()?)
        .with_db_pool(pool)
        .with_roster_source(source)
        .with_identity_provider(Arc::new(identity));
    info!(addr = %config.bind_addr(), "starting HTTP server");

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    let result = server.await;
    health_state.mark_unhealthy();
    result.wrap_err("HTTP server terminated with an error")
}
