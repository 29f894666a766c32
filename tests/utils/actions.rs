use serde_json::{json, Value};

use campus_realtime::{websockets::Envelope, MessageHandler};

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Wait until the router has applied every command sent so far.
    ///
    /// The router processes commands in order, so answering a query means all
    /// earlier frames have been routed.
    pub async fn flush(&self) {
        self.router.stats().await.unwrap();
    }

    /// Send a raw text frame as `client` and wait for processing
    pub async fn send_raw(&self, client: &str, frame: &str) {
        let connection_id = self.connection_id(client);
        self.input_handler
            .handle_message(&connection_id, frame.to_string())
            .await
            .unwrap();
        self.flush().await;
    }

    /// Send an `{event, data}` frame as `client` and wait for processing
    pub async fn send_event(&self, client: &str, event: &str, data: Value) {
        let frame = serde_json::to_string(&Envelope::new(event, data)).unwrap();
        self.send_raw(client, &frame).await;
    }

    /// Drop the client's connection the way the socket task does on close
    pub async fn disconnect(&self, client: &str) {
        self.router.disconnect(self.connection_id(client)).unwrap();
        self.flush().await;
    }

    /// Drain everything the router pushed to `client` so far
    pub async fn frames_for(&self, client: &str) -> Vec<String> {
        let mut receiver = self.client(client).outbound.lock().await;
        let mut frames = Vec::new();
        while let Ok(frame) = receiver.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Discard all pending frames for every client
    pub async fn clear_messages(&self) {
        for name in &self.client_names {
            self.frames_for(name).await;
        }
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    pub async fn send_setup(&self, client: &str, user_id: &str) {
        self.send_event(client, "setup", json!({ "_id": user_id }))
            .await;
    }

    pub async fn send_join_chat(&self, client: &str, room: &str) {
        self.send_event(client, "join chat", json!(room)).await;
    }

    pub async fn send_join_room(&self, client: &str, room: &str) {
        self.send_event(client, "joinRoom", json!(room)).await;
    }

    /// Send a `new message` and return the payload that was sent
    pub async fn send_new_message(
        &self,
        client: &str,
        sender_id: &str,
        participants: Vec<&str>,
        content: &str,
    ) -> Value {
        let users: Vec<Value> = participants
            .iter()
            .map(|id| json!({ "_id": id }))
            .collect();
        let payload = json!({
            "_id": "m1",
            "sender": { "_id": sender_id },
            "content": content,
            "chat": { "_id": "c1", "users": users },
        });
        self.send_event(client, "new message", payload.clone()).await;
        payload
    }

    pub async fn send_room_message(&self, client: &str, room_id: &str, content: Value) {
        self.send_event(
            client,
            "sendMessage",
            json!({ "roomId": room_id, "content": content }),
        )
        .await;
    }

    pub async fn send_typing(&self, client: &str, room: &str) {
        self.send_event(client, "typing", json!(room)).await;
    }

    pub async fn send_stop_typing(&self, client: &str, room: &str) {
        self.send_event(client, "stop typing", json!(room)).await;
    }
}
