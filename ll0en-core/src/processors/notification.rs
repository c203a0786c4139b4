//! Telegram resolution and delivery.
//!
//! The NotificationDispatchClient is responsible for:
//! - Resolving telegram content from a Eurocore template or static configuration
//! - Addressing the telegram to the classified nation
//! - Handing it to the gateway in a single attempt
//!
//! A failed send is not retried or queued; the telegram is lost for that
//! happening.

use std::sync::Arc;

use async_trait::async_trait;
use ll0en_sdk::client::{ClientError, EurocoreClient};
use ll0en_sdk::objects::{NewTelegram, TelegramType, Template};
use thiserror::Error;
use tracing::debug;

use crate::config::NotificationSource;

/// Errors that can occur while resolving or sending a telegram.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The named template could not be fetched.
    #[error("failed to resolve template {template}: {source}")]
    Template {
        template: String,
        #[source]
        source: ClientError,
    },

    /// The gateway did not accept the telegram.
    #[error("failed to send telegram: {0}")]
    Send(#[source] ClientError),
}

/// Seam between reactions and the telegram gateway.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Fetch a named template.
    async fn template(&self, name: &str) -> Result<Template, ClientError>;

    /// Queue one telegram for delivery.
    async fn send(&self, telegram: &NewTelegram) -> Result<(), ClientError>;
}

#[async_trait]
impl NotificationGateway for EurocoreClient {
    async fn template(&self, name: &str) -> Result<Template, ClientError> {
        self.get_template(name).await
    }

    async fn send(&self, telegram: &NewTelegram) -> Result<(), ClientError> {
        self.send_telegram(telegram).await
    }
}

/// Resolves and sends telegrams through a [`NotificationGateway`].
#[derive(Clone)]
pub struct NotificationDispatchClient {
    gateway: Arc<dyn NotificationGateway>,
}

impl NotificationDispatchClient {
    pub fn new(gateway: Arc<dyn NotificationGateway>) -> Self {
        Self { gateway }
    }

    /// Build the telegram for `recipient` from `source`.
    pub async fn resolve(
        &self,
        source: &NotificationSource,
        kind: TelegramType,
        recipient: &str,
    ) -> Result<NewTelegram, DispatchError> {
        let telegram = match source {
            NotificationSource::Template(name) => {
                let template =
                    self.gateway
                        .template(name)
                        .await
                        .map_err(|source| DispatchError::Template {
                            template: name.clone(),
                            source,
                        })?;
                debug!(template = %name, sender = %template.nation, "Resolved telegram template");

                NewTelegram {
                    id: template.tgid.to_string(),
                    secret: template.key,
                    recipient: recipient.to_string(),
                    sender: template.nation,
                    telegram_type: kind,
                }
            }
            NotificationSource::Static(telegram) => NewTelegram {
                id: telegram.id.to_string(),
                secret: telegram.secret.clone(),
                recipient: recipient.to_string(),
                sender: telegram.author.clone(),
                telegram_type: kind,
            },
        };

        Ok(telegram)
    }

    /// Resolve the telegram and send it once.
    pub async fn resolve_and_send(
        &self,
        kind: TelegramType,
        recipient: &str,
        source: &NotificationSource,
    ) -> Result<(), DispatchError> {
        let telegram = self.resolve(source, kind, recipient).await?;
        self.gateway
            .send(&telegram)
            .await
            .map_err(DispatchError::Send)
    }
}
