use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::router::{health_check, room_members};
use crate::shared::AppState;
use crate::websockets::websocket_handler;

/// Builds the HTTP application: socket endpoint, introspection routes, CORS and tracing
pub fn build_app(app_state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(allowed_origins(&app_state.config.allowed_origins));

    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/rooms/:room_id/members", get(room_members))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn allowed_origins(configured: &[String]) -> AllowOrigin {
    if configured.iter().any(|origin| origin == "*") {
        return AllowOrigin::any();
    }

    let origins: Vec<HeaderValue> = configured
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid allowed origin");
                None
            }
        })
        .collect();

    AllowOrigin::list(origins)
}
