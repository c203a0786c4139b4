//! Eurocore telegram gateway objects.

use serde::{Deserialize, Serialize};

/// A telegram template registered with Eurocore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    /// Nation the telegram is sent from.
    pub nation: String,
    /// NationStates telegram id.
    pub tgid: i64,
    /// NationStates telegram secret key.
    pub key: String,
}

/// Delivery category of a telegram.
///
/// Recruitment telegrams are subject to the stricter NationStates recruitment
/// rate limit and opt-out rules; standard telegrams are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelegramType {
    Standard,
    Recruitment,
}

impl std::fmt::Display for TelegramType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelegramType::Standard => write!(f, "standard"),
            TelegramType::Recruitment => write!(f, "recruitment"),
        }
    }
}

/// A telegram queued for delivery through `POST /telegrams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTelegram {
    pub id: String,
    pub secret: String,
    pub recipient: String,
    pub sender: String,
    #[serde(rename = "type")]
    pub telegram_type: TelegramType,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_serialization() {
        let telegram = NewTelegram {
            id: "123".to_string(),
            secret: "abc".to_string(),
            recipient: "free_republic".to_string(),
            sender: "testlandia".to_string(),
            telegram_type: TelegramType::Recruitment,
        };
        let value = serde_json::to_value(&telegram).unwrap();
        assert_eq!(value["type"], "recruitment");
        assert_eq!(value["recipient"], "free_republic");
    }

    #[test]
    fn test_template_parsing() {
        let json = r#"{"id":7,"nation":"testlandia","tgid":4242,"key":"deadbeef"}"#;
        let template: Template = serde_json::from_str(json).unwrap();
        assert_eq!(template.tgid, 4242);
        assert_eq!(template.nation, "testlandia");
    }
}
