use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::Request;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod assembler;
mod config;
mod middleware;
mod narrative;
mod routes;
mod state;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bento Daily Analysis API",
        version = "0.1.0",
        description = "Scores a day of food logs and returns coaching text. Every call resolves to a usable result; degraded answers are flagged with isBackup."
    ),
    paths(
        routes::health::health_check,
        routes::analyze::analyze_day,
    ),
    components(schemas(
        HealthResponse,
        bento_core::analysis::AnalysisResult,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bento_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = config::ServiceConfig::from_env();
    tracing::info!(
        scoring_mode = ?config.policy.scoring.mode,
        score_band = ?config.policy.scoring.band,
        narrative_timeout_secs = config.narrative_timeout.as_secs(),
        "Loaded analysis policy"
    );

    // The narrative client is shared; its credentials are resolved per call.
    let app_state = state::AppState::new(
        config.policy,
        Arc::new(narrative::OpenAiNarrativeClient::new()),
        config.narrative_timeout,
    );

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::router())
        .layer(axum::middleware::from_fn(middleware::security_headers::apply))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(
                    |request: &Request<axum::body::Body>| {
                        let request_id = request
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id,
                        )
                    },
                ))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(middleware::cors::build_cors_layer()),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Bento API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .await
        .expect("Server exited with error");
}
