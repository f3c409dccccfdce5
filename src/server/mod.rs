mod handlers;
mod state;

use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::location::LocationResolver;

pub use handlers::{LocationParams, ValidityResponse};

pub fn build_router(resolver: Arc<LocationResolver>) -> Router {
    let state = Arc::new(AppState { resolver });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/countries", get(handlers::countries))
        .route("/cities", get(handlers::cities).post(handlers::cities))
        .route("/valid/country", get(handlers::valid_country).post(handlers::valid_country))
        .route("/valid/city", get(handlers::valid_city).post(handlers::valid_city))
        .layer(cors)
        // Every response carries the header, not only CORS requests.
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .with_state(state)
}

pub async fn start(resolver: Arc<LocationResolver>, host: &str, port: u16) -> std::io::Result<()> {
    let app = build_router(resolver);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, "Location server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
