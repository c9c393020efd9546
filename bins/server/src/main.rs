//! MyMoney API Server
//!
//! Main entry point for the budget planner service.

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mymoney_api::{AppState, create_router};
use mymoney_core::planner::PlannerOptions;
use mymoney_db::connect_with;
use mymoney_db::migration::{Migrator, MigratorTrait};
use mymoney_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mymoney=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    let options = PlannerOptions::try_from(&config.planner)?;

    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    Migrator::up(&db, None).await?;
    info!("Schema is up to date");

    info!(
        time_zone = options.time_zone.name(),
        history_months = options.history_months,
        currency = %config.planner.currency_label,
        "Planner configured"
    );
    let state = AppState::new(db, options, &config.planner.currency_label);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
