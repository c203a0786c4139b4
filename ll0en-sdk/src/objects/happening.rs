//! Payload of a single record on the NationStates happenings feed.

use serde::{Deserialize, Serialize};

/// JSON body carried in the `data:` field of a feed event.
///
/// Only `str` is guaranteed; the HTML rendering and timestamp are kept for
/// logging but nothing depends on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HappeningPayload {
    #[serde(rename = "str")]
    pub text: String,
    #[serde(rename = "htmlStr", default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_payload() {
        let json = r#"{"str":"@@testlandia@@ resigned from the World Assembly.","htmlStr":"<a>x</a>","time":1700000000}"#;
        let payload: HappeningPayload = serde_json::from_str(json).unwrap();
        assert_eq!(
            payload.text,
            "@@testlandia@@ resigned from the World Assembly."
        );
        assert_eq!(payload.time, Some(1700000000));
    }

    #[test]
    fn test_parse_text_only() {
        let payload: HappeningPayload = serde_json::from_str(r#"{"str":"hello"}"#).unwrap();
        assert_eq!(payload.text, "hello");
        assert!(payload.html.is_none());
    }

    #[test]
    fn test_missing_text_is_an_error() {
        assert!(serde_json::from_str::<HappeningPayload>(r#"{"time":1}"#).is_err());
    }
}
