//! Bounded, time-expiring cache of the most recent interactions.
//!
//! The cache is a pure projection of the tail of the active
//! conversation's messages: it holds no information that is not also in
//! the journal store, and it can be rebuilt from the journal at any time.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::conversation::{Message, MessageRole};
use crate::error::{ParleyError, Result};

/// One user/assistant message pair, derived from a conversation's
/// messages. Interactions are never stored independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    /// The user message that opened the turn.
    pub user: Message,
    /// The assistant reply that closed it.
    pub assistant: Message,
}

impl Interaction {
    /// The timestamp of the pair, taken from the assistant message.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.assistant.timestamp
    }
}

/// A cached interaction together with its insertion instant.
///
/// Entries leave the cache by capacity eviction or by age expiry and
/// never come back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub interaction: Interaction,
    pub inserted_at: DateTime<Utc>,
}

/// Capacity and expiry window of a [`RecencyCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum number of interactions held at once.
    pub capacity: usize,
    /// Age beyond which an entry is no longer eligible to be read.
    pub expiry: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 3,
            expiry: Duration::minutes(30),
        }
    }
}

/// Fixed-capacity, time-bounded view of the most recent interactions of
/// the active conversation.
///
/// There is no background eviction: expiry is evaluated lazily, on every
/// read, against a caller-supplied clock. Taking `now` as a parameter
/// keeps the cache deterministic under test.
#[derive(Debug)]
pub struct RecencyCache {
    settings: CacheSettings,
    entries: VecDeque<CacheEntry>,
}

impl RecencyCache {
    /// Creates an empty cache with the given settings.
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            entries: VecDeque::with_capacity(settings.capacity),
        }
    }

    /// The settings this cache was created with.
    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// Rebuilds the cache from a conversation's full message sequence.
    ///
    /// Walks the sequence from the end, pairing each assistant message
    /// with the immediately preceding user message, until the capacity is
    /// reached or the sequence is exhausted. The collected interactions
    /// are stored in chronological order; each entry's insertion instant
    /// is the interaction's own timestamp, so rebuilt entries age from
    /// the moment the pair was produced.
    ///
    /// A single trailing user message is tolerated: it is the in-flight
    /// turn whose reply has not been recorded yet. Any other violation of
    /// user/assistant alternation in the scanned tail fails with
    /// [`ParleyError::MalformedConversation`], leaving the cache
    /// untouched.
    ///
    /// Rebuilding twice from the same sequence yields the same contents.
    pub fn rebuild(&mut self, messages: &[Message]) -> Result<()> {
        let mut collected: Vec<Interaction> = Vec::new();
        let mut idx = messages.len();

        while idx > 0 && collected.len() < self.settings.capacity {
            idx -= 1;
            match messages[idx].role {
                MessageRole::Assistant => {
                    if idx == 0 {
                        return Err(ParleyError::malformed(
                            "assistant message has no preceding user message",
                        ));
                    }
                    let user = &messages[idx - 1];
                    if user.role != MessageRole::User {
                        return Err(ParleyError::malformed(
                            "two consecutive assistant messages",
                        ));
                    }
                    collected.push(Interaction {
                        user: user.clone(),
                        assistant: messages[idx].clone(),
                    });
                    idx -= 1;
                }
                MessageRole::User => {
                    // The last message may be a user turn still awaiting
                    // its reply; anywhere else the alternation is broken.
                    if idx != messages.len() - 1 {
                        return Err(ParleyError::malformed("unpaired user message"));
                    }
                }
            }
        }

        self.entries.clear();
        for interaction in collected.into_iter().rev() {
            let inserted_at = interaction.timestamp();
            self.entries.push_back(CacheEntry {
                interaction,
                inserted_at,
            });
        }
        Ok(())
    }

    /// Appends one interaction, evicting the oldest entry first when the
    /// cache is at capacity.
    pub fn insert(&mut self, interaction: Interaction, now: DateTime<Utc>) {
        if self.entries.len() >= self.settings.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(CacheEntry {
            interaction,
            inserted_at: now,
        });
    }

    /// Removes every entry whose age exceeds the expiry window.
    ///
    /// Read operations call this themselves, so no stale entry is ever
    /// observable through them.
    pub fn expire(&mut self, now: DateTime<Utc>) {
        let expiry = self.settings.expiry;
        while let Some(entry) = self.entries.front() {
            if now - entry.inserted_at > expiry {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Empties the cache immediately, bypassing expiry logic.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of live entries.
    pub fn size(&mut self, now: DateTime<Utc>) -> usize {
        self.expire(now);
        self.entries.len()
    }

    /// Age of the oldest live entry; zero when the cache is empty.
    pub fn oldest_age(&mut self, now: DateTime<Utc>) -> Duration {
        self.expire(now);
        self.entries
            .front()
            .map(|entry| now - entry.inserted_at)
            .unwrap_or_else(Duration::zero)
    }

    /// Live entries in chronological order.
    pub fn entries(&mut self, now: DateTime<Utc>) -> &VecDeque<CacheEntry> {
        self.expire(now);
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    /// Builds `n` complete turns, one minute apart.
    fn turns(n: usize) -> Vec<Message> {
        let mut messages = Vec::new();
        for i in 0..n {
            let at = base_time() + Duration::minutes(i as i64);
            messages.push(Message::user(format!("question {}", i + 1), at));
            messages.push(Message::assistant(format!("answer {}", i + 1), at));
        }
        messages
    }

    fn settings() -> CacheSettings {
        CacheSettings::default()
    }

    #[test]
    fn rebuild_keeps_most_recent_interactions_in_order() {
        let mut cache = RecencyCache::new(settings());
        cache.rebuild(&turns(5)).unwrap();

        let now = base_time() + Duration::minutes(5);
        let entries = cache.entries(now);
        assert_eq!(entries.len(), 3);
        let contents: Vec<&str> = entries
            .iter()
            .map(|e| e.interaction.assistant.content.as_str())
            .collect();
        assert_eq!(contents, vec!["answer 3", "answer 4", "answer 5"]);
    }

    #[test]
    fn rebuild_with_fewer_turns_than_capacity() {
        let mut cache = RecencyCache::new(settings());
        cache.rebuild(&turns(2)).unwrap();
        assert_eq!(cache.size(base_time() + Duration::minutes(2)), 2);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let messages = turns(4);
        let mut cache = RecencyCache::new(settings());
        cache.rebuild(&messages).unwrap();
        let first: Vec<CacheEntry> = cache.entries.iter().cloned().collect();

        cache.rebuild(&messages).unwrap();
        let second: Vec<CacheEntry> = cache.entries.iter().cloned().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn rebuild_tolerates_trailing_user_message() {
        let mut messages = turns(2);
        messages.push(Message::user(
            "pending question",
            base_time() + Duration::minutes(2),
        ));

        let mut cache = RecencyCache::new(settings());
        cache.rebuild(&messages).unwrap();
        assert_eq!(cache.size(base_time() + Duration::minutes(2)), 2);
    }

    #[test]
    fn rebuild_rejects_consecutive_same_role_messages() {
        let at = base_time();
        let messages = vec![
            Message::user("hello", at),
            Message::user("hello again", at),
            Message::assistant("hi", at),
        ];

        let mut cache = RecencyCache::new(settings());
        let err = cache.rebuild(&messages).unwrap_err();
        assert!(matches!(err, ParleyError::MalformedConversation { .. }));
    }

    #[test]
    fn rebuild_rejects_leading_assistant_message() {
        let messages = vec![Message::assistant("unprompted", base_time())];
        let mut cache = RecencyCache::new(settings());
        let err = cache.rebuild(&messages).unwrap_err();
        assert!(matches!(err, ParleyError::MalformedConversation { .. }));
    }

    #[test]
    fn failed_rebuild_leaves_cache_untouched() {
        let mut cache = RecencyCache::new(settings());
        cache.rebuild(&turns(2)).unwrap();

        let bad = vec![Message::assistant("unprompted", base_time())];
        assert!(cache.rebuild(&bad).is_err());
        assert_eq!(cache.size(base_time()), 2);
    }

    #[test]
    fn insert_evicts_oldest_at_capacity() {
        let mut cache = RecencyCache::new(settings());
        for i in 0..4 {
            let at = base_time() + Duration::minutes(i);
            let interaction = Interaction {
                user: Message::user(format!("q{}", i), at),
                assistant: Message::assistant(format!("a{}", i), at),
            };
            cache.insert(interaction, at);
        }

        let now = base_time() + Duration::minutes(4);
        let contents: Vec<&str> = cache
            .entries(now)
            .iter()
            .map(|e| e.interaction.assistant.content.as_str())
            .collect();
        assert_eq!(contents, vec!["a1", "a2", "a3"]);
    }

    #[test]
    fn entries_expire_after_window() {
        let at = base_time();
        let mut cache = RecencyCache::new(settings());
        cache.insert(
            Interaction {
                user: Message::user("q", at),
                assistant: Message::assistant("a", at),
            },
            at,
        );

        // Still alive right at the edge of the window.
        assert_eq!(cache.size(at + Duration::minutes(30)), 1);

        // Gone one minute past it.
        let late = at + Duration::minutes(31);
        assert_eq!(cache.size(late), 0);
        assert_eq!(cache.oldest_age(late), Duration::zero());
        assert!(cache.entries(late).is_empty());
    }

    #[test]
    fn oldest_age_reports_oldest_live_entry() {
        let mut cache = RecencyCache::new(settings());
        for i in 0..2 {
            let at = base_time() + Duration::minutes(i * 5);
            cache.insert(
                Interaction {
                    user: Message::user(format!("q{}", i), at),
                    assistant: Message::assistant(format!("a{}", i), at),
                },
                at,
            );
        }

        let now = base_time() + Duration::minutes(10);
        assert_eq!(cache.oldest_age(now), Duration::minutes(10));
    }

    #[test]
    fn clear_empties_immediately() {
        let mut cache = RecencyCache::new(settings());
        cache.rebuild(&turns(3)).unwrap();
        cache.clear();
        assert_eq!(cache.size(base_time()), 0);
    }
}
