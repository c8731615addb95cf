use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryActorDirectory, InMemoryApplicationRepository};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loanflow::config::AppConfig;
use loanflow::error::AppError;
use loanflow::telemetry;
use loanflow::workflows::origination::{
    AssessmentEngine, LoanApplicationService, OriginationState, RiskModel,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let directory = Arc::new(InMemoryActorDirectory::seeded());
    let engine = Arc::new(AssessmentEngine::for_version(
        &config.assessment.model_version,
        RiskModel::randomized(),
    )?);
    let service = Arc::new(LoanApplicationService::new(repository, engine));

    let app = with_application_routes(OriginationState::new(service, directory))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan origination service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
