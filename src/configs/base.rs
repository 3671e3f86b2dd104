use serde::{Deserialize, Serialize};

use crate::{common::errors::ConfigError, configs::*};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub lavalink: LavalinkConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = if std::path::Path::new("config.toml").exists() {
            "config.toml"
        } else if std::path::Path::new("config.default.toml").exists() {
            "config.default.toml"
        } else {
            return Err(ConfigError::NotFound);
        };

        let config_str = std::fs::read_to_string(config_path)?;
        let mut config = Self::from_toml(&config_str)
            .map_err(|e| match e {
                ConfigError::Empty(_) => ConfigError::Empty(config_path.to_string()),
                other => other,
            })?;

        if let Ok(password) = std::env::var("LAVALINK_PASSWORD") {
            config.lavalink.password = password;
        }

        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Err(ConfigError::Empty("config".to_string()));
        }
        Ok(toml::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [lavalink]
            password = "youshallnotpass"
            user_id = 1234
            "#,
        )
        .expect("valid config");

        assert_eq!(config.lavalink.host, "127.0.0.1");
        assert_eq!(config.lavalink.port, 2333);
        assert_eq!(config.lavalink.search_prefix, "ytsearch");
        assert_eq!(config.player.idle_timeout_secs, 300);
        assert_eq!(config.player.retry_backoff_ms, 1000);
        assert!(!config.player.loop_by_default);
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_player_section_overrides() {
        let config = Config::from_toml(
            r#"
            [lavalink]
            password = "pw"
            user_id = 1

            [player]
            idle_timeout_secs = 60
            loop_by_default = true

            [logging]
            level = "debug"
            "#,
        )
        .expect("valid config");

        assert_eq!(config.player.idle_timeout_secs, 60);
        assert!(config.player.loop_by_default);
        assert_eq!(config.player.voice_timeout_ms, 10_000);
        assert_eq!(
            config.logging.and_then(|l| l.level).as_deref(),
            Some("debug")
        );
    }

    #[test]
    fn test_empty_config_is_rejected() {
        assert!(matches!(
            Config::from_toml("  \n"),
            Err(ConfigError::Empty(_))
        ));
    }

    #[test]
    fn test_missing_lavalink_section_is_parse_error() {
        assert!(matches!(
            Config::from_toml("[player]\nidle_timeout_secs = 5\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
