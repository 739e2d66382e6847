use std::net::SocketAddr;

use axum::Router;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod error;
mod extract;
mod gateway;
mod middleware;
mod pipeline;
mod routes;
mod state;
mod store;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Solace Analysis API",
        version = "0.1.0",
        description = "Empathic analysis for journal entries: accepts entry text, asks a language model for a structured reading, normalizes it, and records it on the entry."
    ),
    paths(routes::health::health_check, routes::analyze::analyze_entry),
    components(schemas(
        HealthResponse,
        routes::analyze::RawResponse,
        pipeline::AnalyzeRequest,
        solace_core::analysis::AnalysisResult,
        solace_core::analysis::Theme,
        solace_core::analysis::Emotion,
        solace_core::entry::EntryStatus,
        solace_core::error::ErrorEnvelope,
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
                .unwrap_or_else(|_| "solace_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Database connection
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Model configuration is resolved once here, never re-read mid-request
    let model_config = gateway::ModelConfig::from_env();
    let model_gateway =
        gateway::ModelGateway::new(model_config).expect("Failed to build model gateway client");

    let app_state = state::AppState {
        db: pool,
        gateway: model_gateway,
    };

    // CORS
    let cors_layer = middleware::cors::build_cors_layer();

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::analyze::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Solace API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
