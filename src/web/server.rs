use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;

use super::api::flight as flight_handlers;
use super::api::live as live_handlers;
use super::api::pass as pass_handlers;
use super::api::tle as tle_handlers;
use super::api_doc::ApiDoc;
use super::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/tle", get(tle_handlers::current_tle))
        .route("/api/pass", get(pass_handlers::next_pass))
        .route("/api/live", get(live_handlers::live))
        .route("/api/flight", get(flight_handlers::flight))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let state = AppState::new(config);

    // Warm the TLE cache so the first request does not wait on the directory
    if let Err(e) = state.current_tle().await {
        log::warn!("Failed to load initial TLE: {}", e);
    }

    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
