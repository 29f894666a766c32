use std::collections::HashMap;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use campus_realtime::{spawn_router, ConnectionId, RouterHandle, WebsocketReceiveHandler};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// A connected client without a real socket: frames pushed by the router land
/// in `outbound`
pub struct TestClient {
    pub connection_id: ConnectionId,
    pub outbound: Mutex<mpsc::UnboundedReceiver<String>>,
}

pub struct TestSetup {
    pub router: RouterHandle,
    pub input_handler: WebsocketReceiveHandler,
    pub clients: HashMap<String, TestClient>,
    pub client_names: Vec<String>,
    pub _router_task: JoinHandle<()>,
}

impl TestSetup {
    pub fn client(&self, name: &str) -> &TestClient {
        self.clients
            .get(name)
            .unwrap_or_else(|| panic!("unknown test client {}", name))
    }

    pub fn connection_id(&self, name: &str) -> ConnectionId {
        self.client(name).connection_id
    }
}

pub struct TestSetupBuilder {
    clients: Vec<String>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self { clients: vec![] }
    }

    pub fn with_clients(mut self, clients: Vec<&str>) -> Self {
        self.clients = clients.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_two_clients(self) -> Self {
        self.with_clients(vec!["alice", "bob"])
    }

    pub fn with_three_clients(self) -> Self {
        self.with_clients(vec!["alice", "bob", "carol"])
    }

    pub async fn build(self) -> TestSetup {
        let (router, router_task) = spawn_router();

        let mut clients = HashMap::new();
        for name in &self.clients {
            let connection_id = Uuid::new_v4();
            let (sender, receiver) = mpsc::unbounded_channel();
            router.connect(connection_id, sender).unwrap();
            clients.insert(
                name.clone(),
                TestClient {
                    connection_id,
                    outbound: Mutex::new(receiver),
                },
            );
        }

        let input_handler = WebsocketReceiveHandler::new(router.clone());

        let setup = TestSetup {
            router,
            input_handler,
            clients,
            client_names: self.clients,
            _router_task: router_task,
        };
        setup.flush().await;
        setup
    }
}
