//! Connection settings for the voice directory service.

use serde::Deserialize;

/// Endpoints and credentials for both directory surfaces (REST + events).
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// REST base URL, e.g. `https://directory.example.net/api`.
    pub api_url: String,
    /// WebSocket event-stream URL, e.g. `wss://directory.example.net/events`.
    pub events_url: String,
    /// Bearer token used for both surfaces.
    pub token: String,
    /// Reconnect base delay in seconds.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    #[serde(default = "default_max_reconnect_delay")]
    pub max_reconnect_delay_secs: u64,
}

fn default_reconnect_delay() -> u64 {
    1
}

fn default_max_reconnect_delay() -> u64 {
    30
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_url", &self.api_url)
            .field("events_url", &self.events_url)
            .field("token", &"[REDACTED]")
            .field("reconnect_delay_secs", &self.reconnect_delay_secs)
            .field("max_reconnect_delay_secs", &self.max_reconnect_delay_secs)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            events_url: String::new(),
            token: String::new(),
            reconnect_delay_secs: default_reconnect_delay(),
            max_reconnect_delay_secs: default_max_reconnect_delay(),
        }
    }
}

impl GatewayConfig {
    /// Event-stream URL with the token attached, ready for the WS handshake.
    pub(crate) fn events_ws_url(&self) -> String {
        format!("{}?token={}", self.events_url, self.token)
    }
}
