//! TOML file configuration structures.
//!
//! These structs directly map to the `config.toml` file format. Required
//! strings default to empty so that a missing value is reported by
//! validation with a descriptive message rather than as a parse error.

use serde::{Deserialize, Serialize};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Nation operating this instance; sent in the NationStates `User-Agent`.
    #[serde(default)]
    pub user: String,
    /// The region whose happenings are watched.
    #[serde(default)]
    pub region: String,
    /// NationStates API requests allowed per window.
    #[serde(default)]
    pub max_requests: Option<i64>,
    /// Length of the API rate-limit window in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default)]
    pub eurocore: EurocoreConfig,
    #[serde(default)]
    pub telegrams: TelegramsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_window_secs() -> u64 {
    30
}

/// Eurocore gateway section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EurocoreConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Telegram settings per happening category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramsConfig {
    /// Sent to nations that leave the region.
    #[serde(rename = "move", default)]
    pub relocate: TelegramConfig,
    /// Sent to nations that resign from the World Assembly.
    #[serde(default)]
    pub resign: TelegramConfig,
}

/// Either a template name, or a static id/key/author triple.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
user = "Testlandia"
region = "Testlandia"
max_requests = 40
window_secs = 30

[eurocore]
url = "https://eurocore.example"
username = "bot"
password = "hunter2"

[telegrams.resign]
template = "resign-welcome"

[telegrams.move]
id = 123456
key = "abcdef"
author = "testlandia"

[log]
level = "debug"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.region, "Testlandia");
        assert_eq!(config.max_requests, Some(40));
        assert_eq!(config.eurocore.username, "bot");
        assert_eq!(
            config.telegrams.resign.template.as_deref(),
            Some("resign-welcome")
        );
        assert_eq!(config.telegrams.relocate.id, Some(123456));
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_defaults() {
        let config: FileConfig = toml::from_str("user = \"x\"").unwrap();
        assert_eq!(config.window_secs, 30);
        assert_eq!(config.max_requests, None);
        assert_eq!(config.log.level, "info");
        assert!(config.region.is_empty());
        assert!(config.telegrams.resign.template.is_none());
    }
}
