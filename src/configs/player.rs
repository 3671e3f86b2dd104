use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    /// How long a session may sit with nothing to play before it leaves voice.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Delay before trying the next track after the backend refused one.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_voice_timeout_ms")]
    pub voice_timeout_ms: u64,
    #[serde(default)]
    pub loop_by_default: bool,
}

impl PlayerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn voice_timeout(&self) -> Duration {
        Duration::from_millis(self.voice_timeout_ms)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            retry_backoff_ms: default_retry_backoff_ms(),
            voice_timeout_ms: default_voice_timeout_ms(),
            loop_by_default: false,
        }
    }
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_voice_timeout_ms() -> u64 {
    10_000
}
