//! Telegram content configuration.

/// Where the content of a telegram comes from.
///
/// The mode is chosen once per category when the configuration is loaded:
/// a configured template name always wins over static values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationSource {
    /// Resolve id, secret and sender through a named Eurocore template at send time.
    Template(String),
    /// Use fixed values from the configuration file.
    Static(StaticTelegram),
}

impl NotificationSource {
    /// Short label for logs.
    pub fn mode(&self) -> &'static str {
        match self {
            NotificationSource::Template(_) => "template",
            NotificationSource::Static(_) => "static",
        }
    }
}

/// A telegram whose id, secret key and author are set in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTelegram {
    pub id: u64,
    pub secret: String,
    pub author: String,
}
