//! Journal store trait.
//!
//! Defines the interface for durable, append-only conversation persistence.

use super::message::Message;
use super::model::ConversationSummary;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// An abstract append-only store of all conversations.
///
/// This trait defines the contract for persisting and retrieving
/// conversation histories, decoupling the conversation manager from the
/// specific storage mechanism (e.g., a JSON file, a database, a remote
/// API).
///
/// # Implementation Notes
///
/// Implementations must make every `append` durable before returning:
/// a message visible to a subsequent read within the same process must
/// also survive a reload from the persistent medium. Nothing in this
/// trait is retried automatically; failures propagate to the caller.
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Appends a message to the named conversation, creating the
    /// conversation if it does not exist yet.
    ///
    /// # Arguments
    ///
    /// * `conversation_id` - The conversation to append to
    /// * `message` - The message to append
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Message appended and persisted
    /// - `Err(_)`: The persistent medium was unwritable; the operation
    ///   is not retried
    async fn append(&self, conversation_id: &str, message: Message) -> Result<()>;

    /// Registers an empty conversation.
    ///
    /// Registering an id that already exists leaves the stored
    /// conversation unchanged.
    ///
    /// # Arguments
    ///
    /// * `conversation_id` - Identifier for the new conversation
    /// * `created_at` - Creation timestamp
    async fn create(&self, conversation_id: &str, created_at: DateTime<Utc>) -> Result<()>;

    /// Lists every stored conversation.
    ///
    /// # Returns
    ///
    /// One summary per conversation, in implementation-defined order.
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>>;

    /// Returns the full ordered message sequence for a conversation.
    ///
    /// An unknown id yields an empty sequence; it is not an error.
    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>>;

    /// Whether a conversation with this id exists.
    async fn contains(&self, conversation_id: &str) -> Result<bool>;
}
