use clap::Parser;
use std::time::Duration;

/// Deployment parameters for the realtime server
#[derive(Clone, Debug, Parser)]
#[command(name = "campus-realtime", version, about = "Chat and presence routing server", long_about = None)]
pub struct Config {
    /// Host address to bind the server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Frontend origins allowed to open sockets and call the API
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// Seconds without any inbound frame before a socket is closed
    #[arg(long, env = "IDLE_TIMEOUT_SECS", default_value_t = 60)]
    pub idle_timeout_secs: u64,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.trim_end_matches('/') == origin)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            idle_timeout_secs: 60,
        }
    }
}
