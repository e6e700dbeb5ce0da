//! Bot API HTTP client

use super::types::{ApiResponse, ChatId, Message, TelegramFile, Update};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Chat platform error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Unknown, message)
    }
}

/// Error classification for chat platform failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Bad or revoked bot token (401, 403)
    Auth,
    /// Bad request, e.g. unknown file id (400, 404)
    InvalidRequest,
    /// Unknown error
    Unknown,
}

/// Telegram Bot API client
pub struct TelegramApi {
    client: Client,
    api_base: String,
    file_base: String,
}

impl TelegramApi {
    pub fn new(token: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_base: format!("https://api.telegram.org/bot{token}"),
            file_base: format!("https://api.telegram.org/file/bot{token}"),
        }
    }

    /// Long-poll for new updates
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, ChatError> {
        self.call(
            "getUpdates",
            &GetUpdatesPayload {
                offset,
                timeout: timeout_secs,
                allowed_updates: ["message"],
            },
        )
        .await
    }

    /// Send a plain-text message to a chat
    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), ChatError> {
        let _: Message = self
            .call("sendMessage", &SendMessagePayload { chat_id, text })
            .await?;
        Ok(())
    }

    /// Resolve a file id and download its bytes
    pub async fn download_document(&self, file_id: &str) -> Result<Vec<u8>, ChatError> {
        let file: TelegramFile = self.call("getFile", &GetFilePayload { file_id }).await?;
        let file_path = file.file_path.ok_or_else(|| {
            ChatError::unknown(format!("getFile returned no file_path for {file_id}"))
        })?;

        let url = format!("{}/{}", self.file_base, file_path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::new(
                classify_status(status.as_u16()),
                format!("file download failed: HTTP {status}"),
            ));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }

    /// One Bot API method call through the `{ok, result, description}` envelope
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &impl Serialize,
    ) -> Result<T, ChatError> {
        let url = format!("{}/{}", self.api_base, method);
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            ChatError::unknown(format!("failed to parse {method} response: {e} - body: {body}"))
        })?;

        if !parsed.ok {
            let description = parsed
                .description
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(ChatError::new(
                classify_status(status.as_u16()),
                format!("{method} failed: HTTP {status}: {description}"),
            ));
        }

        parsed
            .result
            .ok_or_else(|| ChatError::unknown(format!("{method}: ok response without result")))
    }
}

fn transport_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::network(format!("request timeout: {e}"))
    } else if e.is_connect() {
        ChatError::network(format!("connection failed: {e}"))
    } else {
        ChatError::unknown(format!("request failed: {e}"))
    }
}

fn classify_status(status: u16) -> ChatErrorKind {
    match status {
        400 | 404 => ChatErrorKind::InvalidRequest,
        401 | 403 => ChatErrorKind::Auth,
        429 => ChatErrorKind::RateLimit,
        500..=599 => ChatErrorKind::ServerError,
        _ => ChatErrorKind::Unknown,
    }
}

// Bot API method payloads

#[derive(Debug, Serialize)]
struct GetUpdatesPayload {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: ChatId,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GetFilePayload<'a> {
    file_id: &'a str,
}
