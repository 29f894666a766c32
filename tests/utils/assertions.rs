//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use serde_json::Value;

use campus_realtime::websockets::Envelope;

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct MessageAssertion<'a> {
    setup: &'a TestSetup,
    clients: Vec<&'a str>,
}

impl<'a> MessageAssertion<'a> {
    /// Create an assertion for all clients in the setup
    pub fn for_all_clients(setup: &'a TestSetup) -> Self {
        let clients = setup.client_names.iter().map(|s| s.as_str()).collect();
        Self { setup, clients }
    }

    /// Create an assertion for specific clients
    pub fn for_clients(setup: &'a TestSetup, clients: Vec<&'a str>) -> Self {
        Self { setup, clients }
    }

    /// Assert that every client received exactly one frame, carrying `expected_event`.
    ///
    /// Consumes the frames.
    pub async fn received_event(self, expected_event: &str) -> MessageContent {
        let mut envelopes = vec![];

        for client in &self.clients {
            let frames = self.setup.frames_for(client).await;
            assert_eq!(
                frames.len(),
                1,
                "{} should have received exactly one frame, got {:?}",
                client,
                frames
            );

            let envelope: Envelope = serde_json::from_str(&frames[0]).unwrap();
            assert_eq!(
                envelope.event, expected_event,
                "{} received wrong event",
                client
            );
            envelopes.push(envelope);
        }

        for (i, envelope) in envelopes.iter().enumerate().skip(1) {
            assert_eq!(
                envelope.data, envelopes[0].data,
                "{} payload differs from {}",
                self.clients[i], self.clients[0]
            );
        }

        MessageContent {
            data: envelopes
                .first()
                .map(|envelope| envelope.data.clone())
                .unwrap_or(Value::Null),
        }
    }

    /// Assert that clients received no frames
    pub async fn received_no_messages(self) {
        for client in &self.clients {
            let frames = self.setup.frames_for(client).await;
            assert!(
                frames.is_empty(),
                "{} should not have received any messages, got {:?}",
                client,
                frames
            );
        }
    }

    /// Assert the exact event sequence for each client (consumes the frames)
    pub async fn received_events_in_order(self, expected: Vec<&str>) {
        for client in &self.clients {
            let events: Vec<String> = self
                .setup
                .frames_for(client)
                .await
                .iter()
                .map(|frame| serde_json::from_str::<Envelope>(frame).unwrap().event)
                .collect();
            assert_eq!(events, expected, "{} received unexpected sequence", client);
        }
    }
}

pub struct MessageContent {
    pub data: Value,
}

impl MessageContent {
    pub fn with_data(self, expected: &Value) -> Self {
        assert_eq!(&self.data, expected, "payload mismatch");
        self
    }
}
