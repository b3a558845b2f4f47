//! Storage and configuration infrastructure for Parley.

pub mod config_service;
pub mod json_journal_store;
pub mod paths;
pub mod secret_service;

pub use config_service::ConfigService;
pub use json_journal_store::JsonJournalStore;
pub use paths::ParleyPaths;
pub use secret_service::SecretService;
