use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::router::{RouterError, RouterHandle};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub router: RouterHandle,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(router: RouterHandle, config: Arc<Config>) -> Self {
        Self { router, config }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Router unavailable")]
    RouterUnavailable,
}

impl From<RouterError> for AppError {
    fn from(_: RouterError) -> Self {
        AppError::RouterUnavailable
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::RouterUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Router unavailable".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
