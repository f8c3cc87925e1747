//! fairmeter-svc - FAIR Assessment Service
//!
//! Assesses a research artifact (dataset or software, identified by a DOI or
//! URL) against the FAIR principles: per-metric pass/fail verdicts, scores,
//! maturity levels and an aggregated summary.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fairmeter_common::config::ServiceConfig;
use fairmeter_svc::refdata::ReferenceData;
use fairmeter_svc::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting fairmeter-svc (FAIR Assessment)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::load()?;

    // Initialize the shared reference data store up front so a broken table
    // fails the process at startup, not the first assessment
    ReferenceData::global()?;

    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config);
    let app = fairmeter_svc::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
