//! HTTP server implementation

use std::sync::Arc;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::llm::LlmService;
use crate::rag::RecipeService;
use crate::store::ChromaStore;
use crate::Result;

/// Start the API server
pub async fn serve_api(config: &AppConfig, host: String, port: u16, enable_cors: bool) -> Result<()> {
    info!("🚀 Starting AIChef API server...");

    // Initialize services; the store connects lazily on first query
    let store = Arc::new(ChromaStore::new(config));
    let llm = LlmService::from_config(config)?;
    if llm.is_none() {
        info!("No LLM key configured - selection will use deterministic fallbacks");
    }
    let recipe_service = Arc::new(RecipeService::new(store, llm, config));

    let state = AppState { recipe_service };

    let mut app = Router::new().nest("/api", routes::api_routes(state));

    // Add middleware layers
    app = app
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        info!("✅ CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    // Start server
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/health  - Health check");
    info!("  POST /api/search  - Structured recipe search");
    info!("  POST /api/answer  - Free-text answer with sources");

    axum::serve(listener, app).await?;

    Ok(())
}
