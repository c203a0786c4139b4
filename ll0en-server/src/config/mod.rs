//! Configuration module for the ll0en binary.
//!
//! Handles loading the TOML file named on the command line (or the default
//! path), validating it and converting it into the runtime types used by
//! `ll0en-core`. Any problem here is fatal: the process never starts in a
//! degraded mode.

pub mod file;

use crate::config::file::{FileConfig, TelegramConfig};
use ll0en_core::config::{NotificationSource, StaticTelegram, WatchConfig};
use ll0en_core::utils::rate_budget::{MAX_REQUESTS, MIN_REQUESTS};
use ll0en_sdk::objects::normalize_name;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Fallback when `max_requests` is not set.
const DEFAULT_MAX_REQUESTS: u32 = 30;

const LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Eurocore connection settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: Url,
    pub username: String,
    pub password: String,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub user: String,
    pub watch: WatchConfig,
    pub eurocore: GatewayConfig,
    pub log_level: String,
    /// The configured `max_requests` when it was out of range and clamped.
    pub clamped_max_requests: Option<i64>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Validate the configuration
    /// 3. Normalise and convert it into runtime types
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content =
            std::fs::read_to_string(&self.config_path).map_err(|source| ConfigError::IoError {
                path: self.config_path.clone(),
                source,
            })?;
        let file_config: FileConfig = toml::from_str(&config_content)?;

        build_loaded_config(file_config)
    }
}

/// Validate a parsed file and convert it into a [`LoadedConfig`].
pub fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let user = file_config.user.trim().to_string();
    if user.is_empty() {
        return Err(validation("user is not set"));
    }

    let region = normalize_name(&file_config.region);
    if region.is_empty() {
        return Err(validation("region is not set"));
    }

    let eurocore = &file_config.eurocore;
    if eurocore.url.is_empty() || eurocore.username.is_empty() || eurocore.password.is_empty() {
        return Err(validation("all eurocore parameters must be set"));
    }
    let url = Url::parse(&eurocore.url)
        .map_err(|e| validation(format!("eurocore url {:?} is invalid: {e}", eurocore.url)))?;

    if file_config.window_secs == 0 {
        return Err(validation("window_secs must be greater than zero"));
    }

    let max_requests = clamp_max_requests(file_config.max_requests);
    let clamped_max_requests = file_config
        .max_requests
        .filter(|configured| *configured != max_requests as i64);

    let watch = WatchConfig {
        region,
        max_requests,
        window: Duration::from_secs(file_config.window_secs),
        resign: notification_source("resign", &file_config.telegrams.resign)?,
        relocate: notification_source("move", &file_config.telegrams.relocate)?,
    };

    Ok(LoadedConfig {
        user,
        watch,
        eurocore: GatewayConfig {
            url,
            username: eurocore.username.clone(),
            password: eurocore.password.clone(),
        },
        log_level: log_level(&file_config.log.level),
        clamped_max_requests,
    })
}

fn clamp_max_requests(configured: Option<i64>) -> u32 {
    match configured {
        None => DEFAULT_MAX_REQUESTS,
        Some(n) => n.clamp(MIN_REQUESTS as i64, MAX_REQUESTS as i64) as u32,
    }
}

/// Pick template mode when a template is named, static mode otherwise.
fn notification_source(
    section: &str,
    telegram: &TelegramConfig,
) -> Result<NotificationSource, ConfigError> {
    let template = telegram.template.as_deref().map(str::trim).unwrap_or_default();
    if !template.is_empty() {
        return Ok(NotificationSource::Template(template.to_string()));
    }

    match (telegram.id, telegram.key.as_deref(), telegram.author.as_deref()) {
        (Some(id), Some(key), Some(author)) if !key.is_empty() && !author.is_empty() => {
            Ok(NotificationSource::Static(StaticTelegram {
                id,
                secret: key.to_string(),
                author: normalize_name(author),
            }))
        }
        _ => Err(validation(format!(
            "telegrams.{section} must set either a template or all of id, key and author"
        ))),
    }
}

fn log_level(level: &str) -> String {
    let level = level.trim().to_lowercase();
    if LOG_LEVELS.contains(&level.as_str()) {
        level
    } else {
        "info".to_string()
    }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}
