//! HTTP server implementation

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::rag::Orchestrator;
use crate::Result;

/// Start the API server
pub async fn serve_api(
    config: &AppConfig,
    host: String,
    port: u16,
    enable_cors: bool,
) -> Result<()> {
    info!("Starting grainwise API server...");

    let orchestrator = Arc::new(Orchestrator::new(config).await?);
    let state = AppState {
        orchestrator,
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
    };

    let api_router = routes::api_routes(state);

    let mut app = Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        info!("CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/health      - Health check");
    info!("  POST /api/chat        - Streamed answer (primary path)");
    info!("  POST /api/chat/query  - Full pipeline result as JSON");

    axum::serve(listener, app).await?;

    Ok(())
}
