use crate::cli::ServeArgs;
use crate::infra::{
    seed_sample_catalog, AppState, InMemoryApiKeyStore, InMemoryAutomationStore,
    InMemorySurveyStore,
};
use crate::routes::with_survey_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use survey_engine::config::AppConfig;
use survey_engine::error::AppError;
use survey_engine::telemetry;
use survey_engine::workflows::surveys::SurveyService;
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

    let surveys = Arc::new(InMemorySurveyStore::default());
    let automations = Arc::new(InMemoryAutomationStore::default());
    let keys = Arc::new(InMemoryApiKeyStore::default());
    if args.seed_sample {
        seed_sample_catalog(&surveys, &automations, &config.engine, Utc::now());
        info!("sample survey catalog loaded");
    }

    let survey_service = Arc::new(SurveyService::new(
        surveys,
        automations,
        keys,
        &config.engine,
    ));

    let app = with_survey_routes(survey_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        throttle_days = config.engine.default_throttle_days,
        "survey lifecycle service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
