//! Telegram Bot channel — long polling + message/photo sending via Bot API.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};

use herald_core::config::TelegramConfig;
use herald_core::error::{HeraldError, Result};
use herald_core::traits::Sender;
use herald_core::types::{IncomingMessage, RecipientId};

/// Per-request timeout. Keeps one unreachable chat from stalling a batch.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Long-poll hold time for getUpdates.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Telegram Bot channel with polling loop.
pub struct TelegramChannel {
    config: TelegramConfig,
    token: String,
    client: reqwest::Client,
    last_update_id: i64,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        let token = config.token();
        Self {
            config,
            token,
            client: reqwest::Client::new(),
            last_update_id: 0,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }

    /// Get updates using long polling.
    pub async fn get_updates(&mut self) -> Result<Vec<TelegramUpdate>> {
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", (self.last_update_id + 1).to_string()),
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ("allowed_updates", "[\"message\"]".into()),
            ])
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 5))
            .send()
            .await
            .map_err(|e| HeraldError::Channel(format!("getUpdates failed: {e}")))?;

        let body: TelegramApiResponse<Vec<TelegramUpdate>> = response
            .json()
            .await
            .map_err(|e| HeraldError::Channel(format!("Invalid Telegram response: {e}")))?;

        if !body.ok {
            return Err(HeraldError::Channel(format!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            )));
        }

        let updates = body.result.unwrap_or_default();
        if let Some(last) = updates.last() {
            self.last_update_id = last.update_id;
        }
        Ok(updates)
    }

    /// Send a text message.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| HeraldError::Channel(format!("sendMessage failed: {e}")))?;

        check_response(response, "sendMessage").await
    }

    /// Upload a local image and send it with a caption.
    /// API: POST /bot{TOKEN}/sendPhoto, multipart with a `photo` file part.
    pub async fn send_photo_upload(
        &self,
        chat_id: i64,
        image: Vec<u8>,
        file_name: &str,
        caption: &str,
    ) -> Result<()> {
        let part = reqwest::multipart::Part::bytes(image).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", part);

        let response = self
            .client
            .post(self.api_url("sendPhoto"))
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| HeraldError::Channel(format!("sendPhoto failed: {e}")))?;

        check_response(response, "sendPhoto").await
    }

    /// Get bot info — used as a startup handshake.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| HeraldError::Channel(format!("getMe failed: {e}")))?;
        let body: TelegramApiResponse<TelegramUser> = response
            .json()
            .await
            .map_err(|e| HeraldError::Channel(format!("Invalid getMe response: {e}")))?;
        body.result
            .ok_or_else(|| HeraldError::Channel("No bot info".into()))
    }

    /// Start the polling loop — consumes self, returns a stream of
    /// IncomingMessages.
    pub fn start_polling(self) -> TelegramPollingStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut channel = self;
            tracing::info!("Telegram polling loop started");

            loop {
                match channel.get_updates().await {
                    Ok(updates) => {
                        for update in updates {
                            if let Some(msg) = update.to_incoming()
                                && tx.send(msg).is_err()
                            {
                                tracing::info!("Telegram polling stopped (receiver dropped)");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Telegram polling error: {e}");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }

                tokio::time::sleep(Duration::from_secs(channel.config.poll_interval)).await;
            }
        });

        TelegramPollingStream { rx }
    }
}

async fn check_response(response: reqwest::Response, method: &str) -> Result<()> {
    let result: TelegramApiResponse<serde_json::Value> = response
        .json()
        .await
        .map_err(|e| HeraldError::Channel(format!("Invalid {method} response: {e}")))?;

    if !result.ok {
        return Err(HeraldError::Channel(format!(
            "{method} error: {}",
            result.description.unwrap_or_default()
        )));
    }
    Ok(())
}

/// Stream of incoming Telegram messages from polling.
pub struct TelegramPollingStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<IncomingMessage>,
}

impl Stream for TelegramPollingStream {
    type Item = IncomingMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Unpin for TelegramPollingStream {}

#[async_trait]
impl Sender for TelegramChannel {
    async fn send_text(&self, recipient: RecipientId, text: &str) -> Result<()> {
        self.send_message(recipient, text).await
    }

    async fn send_photo(
        &self,
        recipient: RecipientId,
        image: Vec<u8>,
        file_name: &str,
        caption: &str,
    ) -> Result<()> {
        self.send_photo_upload(recipient, image, file_name, caption)
            .await
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
}

impl TelegramUpdate {
    /// Convert to the command surface's IncomingMessage. Bot-authored and
    /// non-text updates yield None.
    pub fn to_incoming(&self) -> Option<IncomingMessage> {
        let msg = self.message.as_ref()?;
        let text = msg.text.as_ref()?;
        let from = msg.from.as_ref()?;

        if from.is_bot {
            return None;
        }

        Some(IncomingMessage {
            chat_id: msg.chat.id,
            sender_id: from.id,
            text: text.clone(),
        })
    }
}
