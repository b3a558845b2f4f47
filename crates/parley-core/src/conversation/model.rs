//! Conversation domain model.

use super::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, ordered sequence of messages, durably identified.
///
/// Conversations are owned exclusively by the journal store; callers
/// interact with them through the store's operations and never mutate
/// a `Conversation` they have been handed directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier (UUID format)
    pub id: String,
    /// Timestamp when the conversation was created
    pub created_at: DateTime<Utc>,
    /// Messages in insertion order
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            messages: Vec::new(),
        }
    }
}

/// Listing row for a conversation: identity plus a message count,
/// without loading the messages themselves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}
