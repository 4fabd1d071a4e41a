//! Bot API wire types.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const UNKNOWN_API_ERROR: &str = "unknown telegram api error";

/// Response wrapper shared by every Bot API method.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(default)]
    pub description: String,
    pub result: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, turning `ok: false` into an API error.
    pub fn into_result(self, method: &str) -> Result<Option<T>> {
        if !self.ok {
            let description = if self.description.is_empty() {
                UNKNOWN_API_ERROR.to_string()
            } else {
                self.description
            };
            return Err(Error::Api {
                method: method.to_string(),
                description,
            });
        }
        Ok(self.result)
    }
}

/// One inbound event. Only the id is interpreted; `raw` is the record exactly
/// as the server sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub update_id: i64,
    pub raw: String,
}

impl Update {
    pub fn new(update_id: i64, raw: impl Into<String>) -> Self {
        Self {
            update_id,
            raw: raw.into(),
        }
    }

    /// Extract the id from a raw record, leaving the rest untouched.
    pub fn from_raw(raw: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct IdOnly {
            update_id: i64,
        }

        let id: IdOnly = serde_json::from_str(raw).map_err(|e| Error::decode("update id", e))?;
        Ok(Self::new(id.update_id, raw))
    }
}

/// Snapshot of the bot's webhook configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookInfo {
    pub url: String,
    pub has_custom_certificate: bool,
    pub pending_update_count: i64,
    pub last_error_date: i64,
    pub last_error_message: String,
    pub max_connections: i64,
    #[serde(rename = "ip_address")]
    pub ip_addr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_error_uses_description() {
        let env: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"ok":false,"description":"Unauthorized","error_code":401}"#).unwrap();
        let err = env.into_result("getMe").unwrap_err();
        assert_eq!(err.to_string(), "getMe: Unauthorized");
    }

    #[test]
    fn test_envelope_error_fallback_description() {
        let env: Envelope<serde_json::Value> = serde_json::from_str(r#"{"ok":false}"#).unwrap();
        let err = env.into_result("deleteWebhook").unwrap_err();
        assert_eq!(err.to_string(), "deleteWebhook: unknown telegram api error");
    }

    #[test]
    fn test_envelope_ok_without_result() {
        let env: Envelope<bool> = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert_eq!(env.into_result("deleteWebhook").unwrap(), None);
    }

    #[test]
    fn test_update_from_raw_keeps_payload() {
        let raw = r#"{"update_id": 42, "message": {"text": "hi"}}"#;
        let update = Update::from_raw(raw).unwrap();
        assert_eq!(update.update_id, 42);
        assert_eq!(update.raw, raw);
    }

    #[test]
    fn test_update_without_id_is_decode_error() {
        let err = Update::from_raw(r#"{"message":{}}"#).unwrap_err();
        assert!(err.to_string().starts_with("decode update id"));
    }

    #[test]
    fn test_webhook_info_partial_decode() {
        let info: WebhookInfo =
            serde_json::from_str(r#"{"url":"https://example.com/hook","pending_update_count":3}"#).unwrap();
        assert_eq!(info.url, "https://example.com/hook");
        assert_eq!(info.pending_update_count, 3);
        assert!(info.last_error_message.is_empty());
    }
}
