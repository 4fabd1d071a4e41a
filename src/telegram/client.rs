//! Bot API client over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use super::types::{Envelope, Update, WebhookInfo};
use crate::error::{Error, Result};
use crate::polling::UpdateSource;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
// Headroom on top of the server-side long-poll wait.
const LONG_POLL_GRACE: Duration = Duration::from_secs(15);

/// Bot API client bound to one bot token.
pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: impl Into<String>) -> Result<Self> {
        let base_url = api_base.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| Error::config(format!("parse api base {:?}: {}", api_base, e)))?;

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    /// `getMe`: the bot's own user record.
    pub async fn get_me(&self) -> Result<Box<RawValue>> {
        or_null(self.call("getMe", None).await?)
    }

    /// `sendMessage`: returns the sent message.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<Box<RawValue>> {
        let params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        or_null(self.call("sendMessage", Some(params)).await?)
    }

    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        self.call::<serde_json::Value>("setWebhook", Some(serde_json::json!({ "url": url })))
            .await?;
        Ok(())
    }

    pub async fn get_webhook_info(&self) -> Result<WebhookInfo> {
        Ok(self.call("getWebhookInfo", None).await?.unwrap_or_default())
    }

    pub async fn delete_webhook(&self) -> Result<()> {
        self.call::<serde_json::Value>("deleteWebhook", Some(serde_json::json!({})))
            .await?;
        Ok(())
    }

    /// `getUpdates` over GET. Each result element is kept as raw JSON with
    /// only its `update_id` extracted.
    pub async fn get_updates(&self, offset: i64, timeout_secs: i64, limit: Option<u32>) -> Result<Vec<Update>> {
        let timeout_secs = timeout_secs.max(0);
        let mut query: Vec<(&str, String)> = Vec::with_capacity(3);
        if offset > 0 {
            query.push(("offset", offset.to_string()));
        }
        query.push(("timeout", timeout_secs.to_string()));
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let request_timeout = (Duration::from_secs(timeout_secs as u64) + LONG_POLL_GRACE).max(REQUEST_TIMEOUT);

        tracing::debug!(offset, timeout_secs, ?limit, "getUpdates");
        let response = self
            .client
            .get(self.endpoint("getUpdates"))
            .query(&query)
            .timeout(request_timeout)
            .send()
            .await?;
        let body = response.text().await?;

        let raw_updates: Vec<Box<RawValue>> = decode_envelope(&body, "getUpdates")?.unwrap_or_default();
        raw_updates
            .iter()
            .map(|raw| Update::from_raw(raw.get()))
            .collect()
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Option<serde_json::Value>) -> Result<Option<T>> {
        let mut request = self.client.post(self.endpoint(method));
        if let Some(params) = &params {
            request = request.json(params);
        }

        tracing::debug!(method, "calling bot api");
        let response = request.send().await?;
        let body = response.text().await?;
        decode_envelope(&body, method)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }
}

/// Decode an `{ok, description, result}` body. HTTP status is not consulted;
/// the envelope carries the outcome.
fn decode_envelope<T: DeserializeOwned>(body: &str, method: &str) -> Result<Option<T>> {
    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| Error::decode(method, e))?;
    envelope.into_result(method)
}

/// A missing `result` prints as JSON `null`.
fn or_null(result: Option<Box<RawValue>>) -> Result<Box<RawValue>> {
    match result {
        Some(raw) => Ok(raw),
        None => RawValue::from_string("null".to_string()).map_err(|e| Error::decode("null result", e)),
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn delete_webhook(&self) -> Result<()> {
        TelegramClient::delete_webhook(self).await
    }

    async fn get_updates(&self, offset: i64, timeout_secs: i64, limit: Option<u32>) -> Result<Vec<Update>> {
        TelegramClient::get_updates(self, offset, timeout_secs, limit).await
    }
}
