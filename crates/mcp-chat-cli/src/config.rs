//! Client configuration.
//!
//! The command line is parsed by `clap` in `main`; the resulting values are
//! folded into a [`ClientConfig`] that the rest of the crate consumes.

use std::time::Duration;

use mcp_chat_core::CursorPolicy;

/// Connection and behavior settings for the chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket endpoint for the chat stream.
    pub ws_url: String,

    /// Base URL of the registry REST API, without a trailing slash.
    pub api_url: String,

    /// Timeout for registry requests and the WebSocket handshake, in seconds.
    pub request_timeout_seconds: u64,

    /// How tool events interact with a streaming assistant entry.
    pub cursor_policy: CursorPolicy,
}

impl ClientConfig {
    /// Default WebSocket endpoint.
    pub const DEFAULT_WS_URL: &'static str = "ws://localhost:8000/ws";

    /// Default registry base URL.
    pub const DEFAULT_API_URL: &'static str = "http://localhost:8000";

    /// Default request timeout, in seconds.
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

    /// Build a config from explicit values, normalizing the API URL.
    #[must_use]
    pub fn new(
        ws_url: impl Into<String>,
        api_url: &str,
        request_timeout_seconds: u64,
        cursor_policy: CursorPolicy,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            api_url: normalize_base_url(api_url),
            request_timeout_seconds,
            cursor_policy,
        }
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_WS_URL,
            Self::DEFAULT_API_URL,
            Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            CursorPolicy::default(),
        )
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.ws_url, "ws://localhost:8000/ws");
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.request_timeout_seconds, 10);
        assert_eq!(config.cursor_policy, CursorPolicy::Preserve);
    }

    #[test]
    fn timeout_duration() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn api_url_loses_trailing_slashes() {
        let config = ClientConfig::new(
            "ws://host/ws",
            "http://host:9000//",
            3,
            CursorPolicy::CloseOnTool,
        );
        assert_eq!(config.api_url, "http://host:9000");
        assert_eq!(config.cursor_policy, CursorPolicy::CloseOnTool);
    }
}
