//! Normalizes an inbound event into the category the transition table is keyed by.

use crate::channels::IncomingMessage;

/// Canonical yes-word, compared lower-cased.
pub const YES: &str = "так";
/// Canonical no-word, compared lower-cased.
pub const NO: &str = "ні";
/// Command that opens a new flow.
pub const START_COMMAND: &str = "/start";

/// Category of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Message carries a photo; holds the largest size's reference.
    Photo(String),
    StartCommand,
    Yes,
    No,
    /// Any other text, including empty text.
    Other,
}

impl Input {
    /// Classify a message. A photo takes precedence over text.
    ///
    /// Text matching is case-insensitive and otherwise exact: no trimming,
    /// no punctuation stripping, no synonyms.
    pub fn classify(msg: &IncomingMessage) -> Self {
        if let Some(photo) = msg.best_photo() {
            return Self::Photo(photo.to_string());
        }
        Self::from_text(msg.text.as_deref().unwrap_or(""))
    }

    pub fn from_text(text: &str) -> Self {
        match text.to_lowercase().as_str() {
            START_COMMAND => Self::StartCommand,
            YES => Self::Yes,
            NO => Self::No,
            _ => Self::Other,
        }
    }
}
