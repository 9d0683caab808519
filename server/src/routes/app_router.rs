use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use http::HeaderValue;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{server_config::cfg, ServerState};

use super::pipeline;

pub struct AppRouter;

impl AppRouter {
    pub fn create(state: ServerState) -> Router {
        let origins = cfg
            .server
            .allowed_origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>().expect("Invalid CORS origin"))
            .collect::<Vec<_>>();

        let cors_layer = CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true);

        Router::new()
            .route("/", get(|| async { "Outreach generation server" }))
            .route("/generate-email", post(pipeline::submit_generation))
            .route("/generate-email/:task_id", get(pipeline::poll_task))
            .route("/regenerate-email", post(pipeline::submit_regeneration))
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer)
            .with_state(state)
            .fallback(handler_404)
    }
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
