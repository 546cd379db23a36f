use crate::cli::ServeArgs;
use crate::infra::{
    build_marketplace, seed_accounts, seed_listings, AppState, DevAccounts, Marketplace,
    DEV_ADMIN_TOKEN, DEV_AGENT_TOKEN, DEV_CUSTOMER_TOKEN,
};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use estate_hub::config::{AppConfig, AppEnvironment, ConfigError};
use estate_hub::error::AppError;
use estate_hub::marketplace::ListingImporter;
use estate_hub::telemetry;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let marketplace = build_marketplace(&config);
    seed_development_data(&config, &marketplace, args.seed_csv.take())?;

    let app = with_service_routes(marketplace.service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "estate hub marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Issues the fixed development accounts when sessions are resolved in-process.
/// Refuses to do so in production.
pub(crate) fn seed_development_data(
    config: &AppConfig,
    marketplace: &Marketplace,
    seed_csv: Option<PathBuf>,
) -> Result<Option<DevAccounts>, AppError> {
    let Some(sessions) = &marketplace.dev_sessions else {
        if seed_csv.is_some() {
            warn!("--seed-csv ignored while a hosted backend is configured");
        }
        info!(backend = ?config.backend, "using hosted auth and storage");
        return Ok(None);
    };
    if config.environment == AppEnvironment::Production {
        return Err(ConfigError::BackendRequired.into());
    }

    let accounts = seed_accounts(&marketplace.store, sessions)?;
    info!(
        admin = %accounts.admin.id,
        agent = %accounts.agent.id,
        customer = %accounts.customer.id,
        admin_token = DEV_ADMIN_TOKEN,
        agent_token = DEV_AGENT_TOKEN,
        customer_token = DEV_CUSTOMER_TOKEN,
        "no hosted backend configured; development sessions issued"
    );
    if let Some(path) = seed_csv {
        let listings = ListingImporter::from_path(&path)?;
        let seeded = seed_listings(&marketplace.store, &accounts.agent, listings)?;
        info!(seeded, path = %path.display(), "listings seeded from CSV");
    }
    Ok(Some(accounts))
}
