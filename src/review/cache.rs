//! Fetched pools kept for the lifetime of one review engine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::flashcards::{Card, PoolMode, UserId};

#[derive(Debug, Clone)]
struct CachedPool {
    cards: Vec<Card>,
    fetched_at: DateTime<Utc>,
}

/// Pools keyed by `(user, mode)`. Entries only leave through explicit
/// invalidation.
#[derive(Debug, Default)]
pub struct PoolCache {
    entries: HashMap<(UserId, PoolMode), CachedPool>,
}

impl PoolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: UserId, mode: PoolMode) -> Option<Vec<Card>> {
        self.entries
            .get(&(user_id, mode))
            .map(|entry| entry.cards.clone())
    }

    pub fn fetched_at(&self, user_id: UserId, mode: PoolMode) -> Option<DateTime<Utc>> {
        self.entries.get(&(user_id, mode)).map(|entry| entry.fetched_at)
    }

    pub fn insert(&mut self, user_id: UserId, mode: PoolMode, cards: Vec<Card>) {
        self.entries.insert(
            (user_id, mode),
            CachedPool {
                cards,
                fetched_at: Utc::now(),
            },
        );
    }

    pub fn invalidate(&mut self, user_id: UserId, mode: PoolMode) {
        self.entries.remove(&(user_id, mode));
    }

    /// Drop every pool of a user. A changed error count can move cards in or
    /// out of any mode's pool.
    pub fn invalidate_user(&mut self, user_id: UserId) {
        self.entries.retain(|(user, _), _| *user != user_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(ids: &[i64]) -> Vec<Card> {
        ids.iter()
            .map(|id| Card::new(*id, 1, "front".to_string(), "back".to_string()))
            .collect()
    }

    #[test]
    fn test_entries_are_keyed_by_user_and_mode() {
        let mut cache = PoolCache::new();
        cache.insert(1, PoolMode::All, cards(&[1, 2]));
        cache.insert(1, PoolMode::ErrorsOnly, cards(&[2]));
        cache.insert(2, PoolMode::All, cards(&[3]));

        assert_eq!(cache.get(1, PoolMode::All).unwrap().len(), 2);
        assert_eq!(cache.get(1, PoolMode::ErrorsOnly).unwrap()[0].id, 2);
        assert!(cache.get(2, PoolMode::ErrorsOnly).is_none());
        assert!(cache.fetched_at(2, PoolMode::All).is_some());
    }

    #[test]
    fn test_invalidation() {
        let mut cache = PoolCache::new();
        cache.insert(1, PoolMode::All, cards(&[1]));
        cache.insert(1, PoolMode::ErrorsOnly, cards(&[1]));
        cache.insert(2, PoolMode::All, cards(&[2]));

        cache.invalidate(1, PoolMode::All);
        assert!(cache.get(1, PoolMode::All).is_none());
        assert_eq!(cache.len(), 2);

        cache.invalidate_user(1);
        assert!(cache.get(1, PoolMode::ErrorsOnly).is_none());
        assert_eq!(cache.len(), 1);

        cache.invalidate_user(2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_empty_pool_is_cached() {
        let mut cache = PoolCache::new();
        cache.insert(1, PoolMode::ErrorsOnly, Vec::new());
        assert_eq!(cache.get(1, PoolMode::ErrorsOnly), Some(Vec::new()));
    }
}
