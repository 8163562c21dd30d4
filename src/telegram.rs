//! Chat delivery endpoint
//!
//! [`Messenger`] is the seam the delivery stage sends through;
//! [`TelegramClient`] implements it against the Telegram Bot API.

use crate::error::{sanitize_error_message, DeliveryError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Formatting mode of a text message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Markdown,
    Plain,
}

/// Chat messaging seam
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message
    async fn send_message(&self, text: &str, mode: ParseMode) -> Result<(), DeliveryError>;

    /// Send an image by URL with a caption
    async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Serialize)]
struct SendPhotoPayload<'a> {
    chat_id: &'a str,
    photo: &'a str,
    caption: &'a str,
    parse_mode: &'static str,
}

/// Telegram Bot API client
pub struct TelegramClient {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn post<T: Serialize + Sync>(
        &self,
        method: &str,
        payload: &T,
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.endpoint(method))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                DeliveryError::RequestFailed(sanitize_error_message(&e.without_url().to_string()))
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        let ok = body.get("ok").and_then(Value::as_bool).unwrap_or(true);
        if !status.is_success() || !ok {
            let description = body
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("no description")
                .to_string();
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                description,
            });
        }

        debug!("Telegram {} succeeded", method);
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(&self, text: &str, mode: ParseMode) -> Result<(), DeliveryError> {
        let payload = SendMessagePayload {
            chat_id: &self.chat_id,
            text,
            parse_mode: match mode {
                ParseMode::Markdown => Some("Markdown"),
                ParseMode::Plain => None,
            },
            disable_web_page_preview: true,
        };
        self.post("sendMessage", &payload).await
    }

    async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), DeliveryError> {
        let payload = SendPhotoPayload {
            chat_id: &self.chat_id,
            photo: photo_url,
            caption,
            parse_mode: "Markdown",
        };
        self.post("sendPhoto", &payload).await
    }
}
