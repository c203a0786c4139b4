//! Runtime configuration types.
//!
//! These types represent the validated configuration the core runs with.
//! Loading and validating the file is handled by the server crate; once
//! built, these values are read-only.

mod notification;

pub use notification::{NotificationSource, StaticTelegram};

use std::time::Duration;

/// Everything the reaction pipeline needs to know, fixed at startup.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Normalised name of the tracked region.
    pub region: String,
    /// Maximum NationStates API queries per window.
    pub max_requests: u32,
    /// Length of the rate-limit window.
    pub window: Duration,
    /// Telegram sent to nations that resign from the World Assembly.
    pub resign: NotificationSource,
    /// Telegram sent to nations that leave the region.
    pub relocate: NotificationSource,
}
