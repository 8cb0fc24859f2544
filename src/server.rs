use std::path::Path;
use std::sync::Arc;

use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::storage::Storage;
use crate::web::handlers;
use crate::web::AppState;

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "fyyur",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create the HTTP router with every page, the health check and static assets
pub fn create_server(storage: Arc<dyn Storage>, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(health))
        .route("/venues", get(handlers::venues))
        .route("/venues/search", post(handlers::search_venues))
        .route(
            "/venues/create",
            get(handlers::create_venue_form).post(handlers::create_venue_submission),
        )
        .route(
            "/venues/:venue_id",
            get(handlers::show_venue).delete(handlers::delete_venue),
        )
        .route(
            "/venues/:venue_id/edit",
            get(handlers::edit_venue_form).post(handlers::edit_venue_submission),
        )
        .route("/artists", get(handlers::artists))
        .route("/artists/search", post(handlers::search_artists))
        .route(
            "/artists/create",
            get(handlers::create_artist_form).post(handlers::create_artist_submission),
        )
        .route(
            "/artists/:artist_id",
            get(handlers::show_artist).delete(handlers::delete_artist),
        )
        .route(
            "/artists/:artist_id/edit",
            get(handlers::edit_artist_form).post(handlers::edit_artist_submission),
        )
        .route("/shows", get(handlers::shows))
        .route(
            "/shows/create",
            get(handlers::create_show_form).post(handlers::create_show_submission),
        )
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(handlers::fallback)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(AppState::new(storage))
}

/// Start the HTTP server on the configured address
pub async fn start_server(storage: Arc<dyn Storage>, config: &Config) -> Result<()> {
    let app = create_server(storage, &config.server.static_dir);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    info!(%addr, "HTTP server running");
    info!("Health check: http://{}/health", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
