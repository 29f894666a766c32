use async_trait::async_trait;
use axum::{
    extract::{ws::rejection::WebSocketUpgradeRejection, State, WebSocketUpgrade},
    http::{header::ORIGIN, HeaderMap},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::registry::ConnectionId;
use crate::router::{RouterError, RouterHandle};
use crate::shared::{AppError, AppState};
use crate::websockets::messages::ClientEvent;

use super::socket::{Connection, MessageHandler};

/// Message handler for receiving WebSocket messages from the client.
///
/// Frames are validated here, at the boundary; malformed ones are logged and
/// dropped without telling the client.
pub struct WebsocketReceiveHandler {
    router: RouterHandle,
}

impl WebsocketReceiveHandler {
    pub fn new(router: RouterHandle) -> Self {
        Self { router }
    }
}

#[async_trait]
impl MessageHandler for WebsocketReceiveHandler {
    async fn handle_message(
        &self,
        connection_id: &ConnectionId,
        message: String,
    ) -> Result<(), RouterError> {
        debug!(
            connection_id = %connection_id,
            message = %message,
            "Received message"
        );

        match ClientEvent::parse(&message) {
            Ok(event) => self.router.dispatch(*connection_id, event),
            Err(e) => {
                warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "Dropping invalid client frame"
                );
                Ok(())
            }
        }
    }
}

/// WebSocket endpoint
/// GET /ws, origin checked against the configured frontend origins before the upgrade
pub async fn websocket_handler(
    headers: HeaderMap,
    State(app_state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    // Browsers always send Origin; other clients may omit it
    if let Some(origin) = headers.get(ORIGIN) {
        let origin = origin.to_str().unwrap_or_default();
        if !app_state.config.is_origin_allowed(origin) {
            warn!(origin = %origin, "Rejecting WebSocket from disallowed origin");
            return Err(AppError::Forbidden(format!("Origin not allowed: {}", origin)));
        }
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(error = %rejection, "Invalid WebSocket upgrade request");
            return Ok(rejection.into_response());
        }
    };

    info!("WebSocket connection requested");
    Ok(ws.on_upgrade(move |socket| handle_websocket_connection(socket, app_state)))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(socket: axum::extract::ws::WebSocket, app_state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "WebSocket connection established");

    // Create the outbound channel (router -> client)
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();

    if let Err(e) = app_state.router.connect(connection_id, outbound_sender) {
        warn!(connection_id = %connection_id, error = %e, "Router unavailable, dropping socket");
        return;
    }

    let message_handler = Arc::new(WebsocketReceiveHandler::new(app_state.router.clone()));

    let connection = Connection::new(
        connection_id,
        Box::new(socket),
        outbound_receiver,
        message_handler,
        app_state.config.idle_timeout(),
    );

    // Run the connection until disconnect
    match connection.run().await {
        Ok(reason) => {
            info!(
                connection_id = %connection_id,
                reason = ?reason,
                "WebSocket connection closed"
            );
        }
        Err(e) => {
            warn!(
                connection_id = %connection_id,
                error = %e,
                "WebSocket connection error"
            );
        }
    }

    // Cleanup: drop every room membership
    if let Err(e) = app_state.router.disconnect(connection_id) {
        debug!(connection_id = %connection_id, error = %e, "Router already stopped");
    }
}
