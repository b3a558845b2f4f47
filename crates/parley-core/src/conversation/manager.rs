//! Conversation lifecycle management.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::journal::JournalStore;
use super::message::Message;
use super::model::ConversationSummary;
use crate::cache::{CacheSettings, RecencyCache};
use crate::error::{ParleyError, Result};

/// Owns the notion of "current conversation" and coordinates the journal
/// store and the recency cache.
///
/// `ConversationManager` is responsible for:
/// - Creating new conversations
/// - Switching between stored conversations
/// - Recording chat turns durably
/// - Keeping the recency cache consistent with the journal tail
///
/// The manager is the explicit context object for one interactive
/// session; it holds the only mutable handle to the cache and drives one
/// turn at a time.
pub struct ConversationManager {
    journal: Arc<dyn JournalStore>,
    cache: RecencyCache,
    active_id: Option<String>,
}

impl ConversationManager {
    /// Creates a manager over a journal store.
    pub fn new(journal: Arc<dyn JournalStore>, settings: CacheSettings) -> Self {
        Self {
            journal,
            cache: RecencyCache::new(settings),
            active_id: None,
        }
    }

    /// Returns the active conversation id, creating and registering a
    /// fresh empty conversation if none is active yet.
    pub async fn current(&mut self) -> Result<String> {
        if let Some(id) = &self.active_id {
            return Ok(id.clone());
        }
        self.start_new().await
    }

    /// Generates a fresh conversation, registers it in the journal store,
    /// makes it active, and clears the recency cache.
    pub async fn start_new(&mut self) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.journal.create(&id, Utc::now()).await?;
        self.active_id = Some(id.clone());
        self.cache.clear();
        Ok(id)
    }

    /// Switches to a stored conversation and rebuilds the cache from its
    /// messages.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The conversation exists and is now active
    /// - `Ok(false)`: Unknown id; the previously active conversation and
    ///   the cache are left exactly as they were
    /// - `Err(_)`: Storage failure, or the stored message sequence could
    ///   not be paired
    pub async fn switch_to(&mut self, id: &str) -> Result<bool> {
        if !self.journal.contains(id).await? {
            return Ok(false);
        }
        let messages = self.journal.messages(id).await?;
        self.cache.rebuild(&messages)?;
        self.active_id = Some(id.to_string());
        Ok(true)
    }

    /// Appends a full user/assistant turn to the active conversation and
    /// refreshes the cache.
    pub async fn record_turn(&mut self, user_content: &str, assistant_content: &str) -> Result<()> {
        let id = self.current().await?;
        self.journal
            .append(&id, Message::user(user_content, Utc::now()))
            .await?;
        self.journal
            .append(&id, Message::assistant(assistant_content, Utc::now()))
            .await?;
        self.rebuild_cache().await
    }

    /// Appends just the user half of a turn.
    ///
    /// The chat interface records the user message before calling the
    /// language model, so the message is durable even when generation
    /// fails. The cache is not touched until the turn completes.
    pub async fn record_user_message(&mut self, content: &str) -> Result<()> {
        let id = self.current().await?;
        self.journal
            .append(&id, Message::user(content, Utc::now()))
            .await
    }

    /// Appends the assistant half of a turn and refreshes the cache.
    pub async fn record_assistant_message(&mut self, content: &str) -> Result<()> {
        let id = self.current().await?;
        self.journal
            .append(&id, Message::assistant(content, Utc::now()))
            .await?;
        self.rebuild_cache().await
    }

    /// Full ordered message sequence of the active conversation.
    pub async fn messages(&mut self) -> Result<Vec<Message>> {
        let id = self.current().await?;
        self.journal.messages(&id).await
    }

    /// Lists all stored conversations.
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.journal.list_conversations().await
    }

    /// Mutable handle to the recency cache, for reads and `clear`.
    pub fn cache_mut(&mut self) -> &mut RecencyCache {
        &mut self.cache
    }

    async fn rebuild_cache(&mut self) -> Result<()> {
        let id = self
            .active_id
            .clone()
            .ok_or_else(|| ParleyError::internal("no active conversation"))?;
        let messages = self.journal.messages(&id).await?;
        self.cache.rebuild(&messages)
    }
}
