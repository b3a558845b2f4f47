//! Single-file JSON implementation of the journal store.
//!
//! The whole store lives in one JSON file mapping conversation id to
//! `{created_at, messages}`. It is loaded fully at construction and
//! rewritten in full on every append, so a message acknowledged to the
//! caller has always reached the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::conversation::{ConversationSummary, JournalStore, Message};
use parley_core::error::{ParleyError, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

/// On-disk record for one conversation. The file keys records by
/// conversation id, so the id is not repeated inside the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConversationRecord {
    created_at: DateTime<Utc>,
    #[serde(default)]
    messages: Vec<Message>,
}

/// Journal store persisted as a single JSON file.
///
/// # File layout
///
/// ```json
/// {
///   "3f2b...-uuid": {
///     "created_at": "2024-01-01T12:00:00Z",
///     "messages": [
///       {"role": "user", "content": "hello", "timestamp": "..."},
///       {"role": "assistant", "content": "hi", "timestamp": "..."}
///     ]
///   }
/// }
/// ```
///
/// The in-memory map is the working copy; the file is the source of
/// truth across restarts. One interactive session writes at a time —
/// there is no cross-process locking discipline.
#[derive(Debug)]
pub struct JsonJournalStore {
    path: PathBuf,
    conversations: Mutex<HashMap<String, ConversationRecord>>,
}

impl JsonJournalStore {
    /// Opens the journal at `path`, reading the full store into memory.
    ///
    /// A missing file initializes an empty store; parent directories are
    /// created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::CorruptData`] if the persisted structure
    /// cannot be parsed. No partial recovery is attempted.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let conversations: HashMap<String, ConversationRecord> = if fs::try_exists(&path).await? {
            let raw = fs::read_to_string(&path).await?;
            serde_json::from_str(&raw).map_err(|e| {
                ParleyError::corrupt_data(format!("{}: {}", path.display(), e))
            })?
        } else {
            HashMap::new()
        };

        tracing::debug!(
            path = %path.display(),
            conversations = conversations.len(),
            "journal loaded"
        );

        Ok(Self {
            path,
            conversations: Mutex::new(conversations),
        })
    }

    /// Opens the journal at the default per-user location.
    pub async fn default_location() -> Result<Self> {
        let path = crate::paths::ParleyPaths::journal_file()
            .map_err(|e| ParleyError::config(format!("Failed to resolve journal path: {}", e)))?;
        Self::open(path).await
    }

    /// Writes the full store to disk.
    async fn persist(&self, conversations: &HashMap<String, ConversationRecord>) -> Result<()> {
        let raw = serde_json::to_string_pretty(conversations)
            .map_err(|e| ParleyError::internal(format!("Failed to serialize journal: {}", e)))?;
        fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl JournalStore for JsonJournalStore {
    async fn append(&self, conversation_id: &str, message: Message) -> Result<()> {
        let mut conversations = self.conversations.lock().await;
        let record = conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| ConversationRecord {
                created_at: message.timestamp,
                messages: Vec::new(),
            });
        record.messages.push(message);
        self.persist(&conversations).await
    }

    async fn create(&self, conversation_id: &str, created_at: DateTime<Utc>) -> Result<()> {
        let mut conversations = self.conversations.lock().await;
        conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| ConversationRecord {
                created_at,
                messages: Vec::new(),
            });
        self.persist(&conversations).await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let conversations = self.conversations.lock().await;
        Ok(conversations
            .iter()
            .map(|(id, record)| ConversationSummary {
                id: id.clone(),
                created_at: record.created_at,
                message_count: record.messages.len(),
            })
            .collect())
    }

    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let conversations = self.conversations.lock().await;
        Ok(conversations
            .get(conversation_id)
            .map(|record| record.messages.clone())
            .unwrap_or_default())
    }

    async fn contains(&self, conversation_id: &str) -> Result<bool> {
        let conversations = self.conversations.lock().await;
        Ok(conversations.contains_key(conversation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, second).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonJournalStore::open(temp_dir.path().join("conversations.json"))
            .await
            .unwrap();

        store
            .append("conv-1", Message::user("hello", at(0)))
            .await
            .unwrap();
        store
            .append("conv-1", Message::assistant("hi there", at(1)))
            .await
            .unwrap();

        let messages = store.messages("conv-1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].content, "hi there");
    }

    #[tokio::test]
    async fn test_round_trip_preserves_messages_exactly() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conversations.json");

        let original = vec![
            Message::user("¿qué hora es?", at(0)),
            Message::assistant("no tengo reloj", at(1)),
        ];

        {
            let store = JsonJournalStore::open(&path).await.unwrap();
            for message in &original {
                store.append("conv-1", message.clone()).await.unwrap();
            }
        }

        // Reload from the persisted file.
        let store = JsonJournalStore::open(&path).await.unwrap();
        let loaded = store.messages("conv-1").await.unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_unknown_conversation_yields_empty_sequence() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonJournalStore::open(temp_dir.path().join("conversations.json"))
            .await
            .unwrap();

        let messages = store.messages("no-such-id").await.unwrap();
        assert!(messages.is_empty());
        assert!(!store.contains("no-such-id").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_registers_empty_conversation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conversations.json");

        {
            let store = JsonJournalStore::open(&path).await.unwrap();
            store.create("conv-empty", at(0)).await.unwrap();
        }

        // Registration must survive a reload.
        let store = JsonJournalStore::open(&path).await.unwrap();
        assert!(store.contains("conv-empty").await.unwrap());
        assert!(store.messages("conv-empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_on_existing_id_keeps_messages() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonJournalStore::open(temp_dir.path().join("conversations.json"))
            .await
            .unwrap();

        store
            .append("conv-1", Message::user("hello", at(0)))
            .await
            .unwrap();
        store.create("conv-1", at(5)).await.unwrap();

        let messages = store.messages("conv-1").await.unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_list_conversations() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonJournalStore::open(temp_dir.path().join("conversations.json"))
            .await
            .unwrap();

        store
            .append("conv-1", Message::user("one", at(0)))
            .await
            .unwrap();
        store
            .append("conv-1", Message::assistant("reply", at(1)))
            .await
            .unwrap();
        store.create("conv-2", at(2)).await.unwrap();

        let mut summaries = store.list_conversations().await.unwrap();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "conv-1");
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(summaries[1].id, "conv-2");
        assert_eq!(summaries[1].message_count, 0);
    }

    #[tokio::test]
    async fn test_unparsable_file_is_corrupt_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conversations.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonJournalStore::open(&path).await.unwrap_err();
        assert!(err.is_corrupt_data());
    }
}
