use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryPlanRepository, InMemoryResellerRepository, InMemorySubmissionRepository,
};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use subtrack::config::AppConfig;
use subtrack::error::AppError;
use chrono::Utc;
use subtrack::submissions::{seed_default_plans, seed_default_resellers, SubmissionService};
use subtrack::telemetry;
use tracing::info;

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

    let submissions = Arc::new(InMemorySubmissionRepository::default());
    let plans = Arc::new(InMemoryPlanRepository::default());
    seed_default_plans(plans.as_ref())?;
    let resellers = Arc::new(InMemoryResellerRepository::default());
    seed_default_resellers(resellers.as_ref(), Utc::now())?;
    let service = Arc::new(SubmissionService::new(
        submissions,
        plans,
        resellers,
        config.expiry,
    ));

    let app = with_service_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        expiring_soon_days = config.expiry.expiring_soon_days,
        "subscription tracker ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
