use serde::{Deserialize, Serialize};

use crate::common::types::UserId;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LavalinkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub password: String,
    #[serde(default)]
    pub secure: bool,
    /// Bot user id, sent as `User-Id` on the websocket handshake.
    pub user_id: UserId,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_search_prefix")]
    pub search_prefix: String,
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
}

impl LavalinkConfig {
    pub fn rest_base(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn websocket_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}/v4/websocket", scheme, self.host, self.port)
    }
}

impl Default for LavalinkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: String::new(),
            secure: false,
            user_id: UserId(0),
            client_name: default_client_name(),
            search_prefix: default_search_prefix(),
            reconnect_attempts: default_reconnect_attempts(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    2333
}

fn default_client_name() -> String {
    format!("tunelink/{}", env!("CARGO_PKG_VERSION"))
}

fn default_search_prefix() -> String {
    "ytsearch".to_string()
}

fn default_reconnect_attempts() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_follow_secure_flag() {
        let mut config = LavalinkConfig::default();
        assert_eq!(config.rest_base(), "http://127.0.0.1:2333");
        assert_eq!(config.websocket_url(), "ws://127.0.0.1:2333/v4/websocket");

        config.secure = true;
        config.host = "node.example".into();
        config.port = 443;
        assert_eq!(config.rest_base(), "https://node.example:443");
        assert_eq!(config.websocket_url(), "wss://node.example:443/v4/websocket");
    }
}
