//! Telegram channel: long-polls the Bot API for updates.
//!
//! Text and photo messages come in; text (with an optional reply keyboard)
//! and documents go out. Photo bytes are fetched through `getFile`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, PhotoSource};
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "telegram";

/// Public Bot API host.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// sendMessage text limit, in characters.
const MAX_MESSAGE_CHARS: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Timeout for every call other than the long poll.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bot API client and update poller.
pub struct TelegramChannel {
    api_base: String,
    bot_token: String,
    allowed_users: Vec<String>,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl TelegramChannel {
    pub fn new(bot_token: String, allowed_users: Vec<String>) -> Result<Self, ChannelError> {
        // Long polls hold the connection open; leave headroom over the poll timeout.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS * 2))
            .build()
            .map_err(|e| ChannelError::StartupFailed {
                name: CHANNEL_NAME.into(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            api_base: DEFAULT_API_BASE.to_string(),
            bot_token,
            allowed_users,
            client,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Timeout for sends, `getFile` and photo downloads. The long poll keeps its own.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Point the channel at another Bot API host (a local Bot API server, or a test stub).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base, self.bot_token)
    }

    /// Whether a sender with any of `identities` (username, numeric id) may talk to the bot.
    pub fn is_allowed<'a>(&self, identities: impl IntoIterator<Item = &'a str>) -> bool {
        sender_allowed(&self.allowed_users, identities)
    }

    /// POST a JSON body to a Bot API method and return its `result`.
    async fn call(&self, method: &str, body: &Value) -> Result<Value, String> {
        let resp = self
            .client
            .post(self.method_url(method))
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        bot_api_result(method, resp).await
    }

    /// Send text, split to the size limit. The keyboard rides on the last chunk.
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        choices: &[String],
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, MAX_MESSAGE_CHARS);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = json!({ "chat_id": chat_id, "text": chunk });
            if i == last {
                if let Some(markup) = reply_keyboard(choices) {
                    body["reply_markup"] = markup;
                }
            }
            self.call("sendMessage", &body).await.map_err(send_failed)?;
        }
        Ok(())
    }

    /// Upload in-memory bytes as a document.
    pub async fn send_document(
        &self,
        chat_id: &str,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<(), ChannelError> {
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name.to_string()));

        let resp = self
            .client
            .post(self.method_url("sendDocument"))
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;
        bot_api_result("sendDocument", resp)
            .await
            .map_err(send_failed)?;

        tracing::info!(chat_id, file_name, "Telegram document sent");
        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(poll_updates(
            self.client.clone(),
            self.method_url("getUpdates"),
            self.allowed_users.clone(),
            tx,
        ));

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });
        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let Some(chat_id) = msg.metadata.get("chat_id").and_then(Value::as_str) else {
            return Err(send_failed("message metadata has no chat_id".into()));
        };

        match response {
            OutgoingResponse::Text { content, choices } => {
                self.send_text(chat_id, &content, &choices).await
            }
            OutgoingResponse::Document { bytes, file_name } => {
                self.send_document(chat_id, bytes, &file_name).await
            }
        }
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let me = self
            .call("getMe", &json!({}))
            .await
            .map_err(|reason| ChannelError::StartupFailed {
                name: CHANNEL_NAME.into(),
                reason,
            })?;
        tracing::info!(
            bot = ?me.get("username"),
            "Telegram bot reachable"
        );
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl PhotoSource for TelegramChannel {
    async fn download(&self, file_ref: &str) -> Result<Vec<u8>, ChannelError> {
        let failed = |reason: String| ChannelError::DownloadFailed {
            name: CHANNEL_NAME.into(),
            file_ref: file_ref.to_string(),
            reason,
        };

        let file = self
            .call("getFile", &json!({ "file_id": file_ref }))
            .await
            .map_err(failed)?;
        let Some(file_path) = file.get("file_path").and_then(Value::as_str) else {
            return Err(failed("getFile result has no file_path".into()));
        };

        let resp = self
            .client
            .get(self.file_url(file_path))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(failed(format!("file download returned {}", resp.status())));
        }

        let bytes = resp.bytes().await.map_err(|e| failed(e.to_string()))?;
        tracing::debug!(file_ref, size = bytes.len(), "Telegram photo downloaded");
        Ok(bytes.to_vec())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn send_failed(reason: String) -> ChannelError {
    ChannelError::SendFailed {
        name: CHANNEL_NAME.into(),
        reason,
    }
}

/// Unwrap the Bot API envelope `{ok, result, description}`.
async fn bot_api_result(method: &str, resp: reqwest::Response) -> Result<Value, String> {
    let status = resp.status();
    let envelope: Value = resp
        .json()
        .await
        .map_err(|e| format!("{method}: unreadable response ({status}): {e}"))?;

    if envelope.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(envelope.get("result").cloned().unwrap_or(Value::Null));
    }
    let description = envelope
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("no description");
    Err(format!("{method} failed ({status}): {description}"))
}

/// getUpdates loop. Runs until the receiving side of `tx` is dropped.
async fn poll_updates(
    client: reqwest::Client,
    url: String,
    allowed_users: Vec<String>,
    tx: mpsc::UnboundedSender<IncomingMessage>,
) {
    let mut offset: i64 = 0;
    tracing::info!("Telegram channel listening for messages...");

    loop {
        let body = json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message"]
        });

        let updates = match client.post(&url).json(&body).send().await {
            Ok(resp) => bot_api_result("getUpdates", resp).await,
            Err(e) => Err(e.to_string()),
        };
        let updates = match updates {
            Ok(Value::Array(updates)) => updates,
            Ok(other) => {
                tracing::warn!(result = %other, "Telegram getUpdates returned a non-array result");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
            Err(e) => {
                tracing::warn!("Telegram poll error: {e}");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for update in &updates {
            if let Some(id) = update.get("update_id").and_then(Value::as_i64) {
                offset = offset.max(id + 1);
            }
            let Some(incoming) = update
                .get("message")
                .and_then(|m| parse_message(m, &allowed_users))
            else {
                continue;
            };
            if tx.send(incoming).is_err() {
                tracing::info!("Telegram listener channel closed");
                return;
            }
        }
    }
}

/// Turn a Bot API `message` object into an `IncomingMessage`.
///
/// Returns `None` for senders outside the allow-list and for messages that
/// carry neither text nor a photo. Sessions are keyed by the sender id,
/// falling back to the chat id.
fn parse_message(message: &Value, allowed_users: &[String]) -> Option<IncomingMessage> {
    let text = message.get("text").and_then(Value::as_str);
    let photo_refs: Vec<&str> = message
        .get("photo")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|size| size.get("file_id").and_then(Value::as_str))
        .collect();
    if text.is_none() && photo_refs.is_empty() {
        return None;
    }

    let from = message.get("from");
    let field = |key: &str| from.and_then(|f| f.get(key));
    let username = field("username").and_then(Value::as_str);
    let sender_id = field("id").and_then(Value::as_i64).map(|id| id.to_string());

    let identities = username.into_iter().chain(sender_id.as_deref());
    if !sender_allowed(allowed_users, identities) {
        tracing::warn!(
            username = username.unwrap_or("unknown"),
            user_id = sender_id.as_deref().unwrap_or("unknown"),
            "Telegram: ignoring message from unauthorized user"
        );
        return None;
    }

    let chat_id = message
        .pointer("/chat/id")
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_default();
    let user_id = sender_id.unwrap_or_else(|| chat_id.clone());

    let mut incoming = IncomingMessage::new(CHANNEL_NAME, user_id)
        .with_photos(photo_refs)
        .with_metadata(json!({ "chat_id": chat_id, "username": username }));
    if let Some(name) = field("first_name").and_then(Value::as_str).or(username) {
        incoming = incoming.with_user_name(name);
    }
    if let Some(text) = text {
        incoming = incoming.with_text(text);
    }
    Some(incoming)
}

/// One-row reply keyboard, or `None` when there are no choices.
fn reply_keyboard(choices: &[String]) -> Option<Value> {
    if choices.is_empty() {
        return None;
    }
    let row: Vec<Value> = choices.iter().map(|c| json!({ "text": c })).collect();
    Some(json!({ "keyboard": [row], "resize_keyboard": true }))
}

fn sender_allowed<'a>(allowed_users: &[String], identities: impl IntoIterator<Item = &'a str>) -> bool {
    if allowed_users.iter().any(|u| u == "*") {
        return true;
    }
    identities
        .into_iter()
        .any(|id| allowed_users.iter().any(|u| u == id))
}

/// Split `text` into chunks of at most `max_chars` characters, preferring
/// to break at a newline, then a space. Whitespace at a break is dropped.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        // Byte offset just past the `max_chars`-th character.
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);
        let window = &rest[..limit];
        let cut = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(0) | None => limit,
            Some(i) => i,
        };
        chunks.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
