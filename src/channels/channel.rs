//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;

/// Canonical answers offered with every yes/no prompt.
pub const YES_NO_CHOICES: [&str; 2] = ["Так", "Ні"];

/// An inbound event from a messaging channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Unique id of this event, for log correlation.
    pub id: Uuid,
    /// Channel the event arrived on.
    pub channel: String,
    /// Stable user identifier; sessions are keyed by it.
    pub user_id: String,
    /// Display name, when the channel knows one.
    pub user_name: Option<String>,
    /// Message text, if any.
    pub text: Option<String>,
    /// Photo references, smallest to largest size.
    pub photo_refs: Vec<String>,
    /// Channel-specific routing data (e.g. `chat_id`).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    pub fn new(channel: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            user_id: user_id.into(),
            user_name: None,
            text: None,
            photo_refs: Vec::new(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_photos<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.photo_refs = refs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Reference of the largest photo size, if the message carries a photo.
    pub fn best_photo(&self) -> Option<&str> {
        self.photo_refs.last().map(String::as_str)
    }
}

/// An outbound reply produced by a conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingResponse {
    /// Plain text, optionally with a set of quick-reply choices.
    Text {
        content: String,
        choices: Vec<String>,
    },
    /// A file delivered as a document attachment.
    Document { bytes: Vec<u8>, file_name: String },
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
            choices: Vec::new(),
        }
    }

    /// Text accompanied by the yes/no choice affordance.
    pub fn yes_no(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
            choices: YES_NO_CHOICES.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn document(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self::Document {
            bytes,
            file_name: file_name.into(),
        }
    }

    /// Text content, if this is a text reply.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Text { content, .. } => Some(content),
            Self::Document { .. } => None,
        }
    }

    /// Whether this reply offers quick-reply choices.
    pub fn has_choices(&self) -> bool {
        matches!(self, Self::Text { choices, .. } if !choices.is_empty())
    }
}

/// Stream of inbound events.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A messaging transport.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start receiving; events are yielded until the channel stops.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver a reply to the sender of `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Resolves a photo reference handed out by a channel into image bytes.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn download(&self, file_ref: &str) -> Result<Vec<u8>, ChannelError>;
}
