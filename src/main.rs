use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use smart_eta::config::ServiceConfig;
use smart_eta::routing::OpenRouteService;
use smart_eta::server::{cors_layer, router, AppState};
use smart_eta::service::EtaService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smart_eta=info,eta_server=info,tower_http=info".into()),
        )
        .init();

    let cfg = ServiceConfig::from_env()?;

    // No valid artifact, no traffic: bail before binding the port.
    let service = EtaService::load(&cfg.artifact_path).with_context(|| {
        format!(
            "cannot serve without a pipeline artifact (ETA_MODEL_PATH={})",
            cfg.artifact_path.display()
        )
    })?;
    tracing::info!(
        "loaded model; feature_names[{}]: {:?}",
        service.artifact().metadata.feature_names.len(),
        &service.artifact().metadata.feature_names
    );

    if cfg.ors_api_key.is_none() {
        tracing::warn!("ORS_API_KEY not set; /get-distance will report route unavailable");
    }
    let routes = OpenRouteService::new(
        cfg.ors_api_key.clone(),
        cfg.ors_base_url.clone(),
        cfg.route_timeout,
    )?;

    let state = AppState {
        predictor: Arc::new(service),
        routes: Arc::new(routes),
        log_predictions: cfg.log_predictions,
    };
    let app = router(state, cors_layer(cfg.cors_allow_origins.as_deref()));

    tracing::info!("listening on {}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
