use crate::cli::ServeArgs;
use crate::infra::{AppState, ConfiguredStore};
use crate::routes::with_exam_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use customs_exam::config::AppConfig;
use customs_exam::error::AppError;
use customs_exam::telemetry;
use customs_exam::workflows::exam::ExamService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

fn apply_overrides(config: &mut AppConfig, args: ServeArgs) {
    let ServeArgs { host, port, store } = args;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(path) = store {
        config.storage.path = Some(path);
    }
}

/// Router with the exam API, operational endpoints and metrics layer.
fn build_app(config: &AppConfig, readiness: Arc<AtomicBool>) -> Result<Router, AppError> {
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let state = AppState {
        readiness,
        metrics: Arc::new(prometheus_handle),
    };

    let store = ConfiguredStore::from_config(&config.storage)?;
    info!(store = store.backend_name(), "exam store ready");
    let service = Arc::new(ExamService::new(Arc::new(store), config.export.clone()));

    Ok(with_exam_routes(service, config.export.clone())
        .layer(Extension(state))
        .layer(prometheus_layer))
}

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    apply_overrides(&mut config, args);
    telemetry::init(&config.telemetry)?;

    let readiness = Arc::new(AtomicBool::new(false));
    let app = build_app(&config, Arc::clone(&readiness))?;

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness.store(true, Ordering::Release);
    info!(environment = ?config.environment, %addr, "previous exam service listening");

    axum::serve(listener, app).await?;
    Ok(())
}
