//! REST API hosting the configured wizards.
//!
//! Each request resolves the caller, rebuilds the wizard against the
//! caller's stored progress and answers with JSON or a redirect to the step
//! the caller should be on.

use std::net::SocketAddr;

use anyhow::Result;
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod caller;
pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

pub use caller::Caller;
pub use openapi::ApiDoc;
pub use state::ApiState;

/// Build the API router with all routes
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/v1/wizards", get(routes::wizards::list))
        .route(
            "/api/v1/wizards/:name",
            get(routes::wizards::get_one).delete(routes::wizards::reset),
        )
        .route(
            "/api/v1/wizards/:name/steps/:slug",
            get(routes::wizards::get_step).post(routes::wizards::submit_step),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the REST API server
pub async fn serve(state: ApiState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("REST API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
