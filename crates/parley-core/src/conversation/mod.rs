//! Conversation domain module.
//!
//! This module contains the conversation-related domain models, the
//! journal-store interface, and the conversation manager.
//!
//! # Module Structure
//!
//! - `message`: Message types (`MessageRole`, `Message`)
//! - `model`: Conversation domain model (`Conversation`, `ConversationSummary`)
//! - `journal`: Journal store trait for conversation persistence
//! - `manager`: Conversation lifecycle management (`ConversationManager`)

mod journal;
mod manager;
mod message;
mod model;

// Re-export public API
pub use journal::JournalStore;
pub use manager::ConversationManager;
pub use message::{Message, MessageRole};
pub use model::{Conversation, ConversationSummary};
