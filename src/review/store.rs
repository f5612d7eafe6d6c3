//! The error-count store a review session reads pools from and reports
//! missed cards to.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flashcards::{Card, CardId, FlashcardStorage, FlashcardStorageError, PoolMode, UserId};

/// Failures a store call can report
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum StoreError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Card not found: {0}")]
    NotFound(CardId),

    #[error("Store unavailable: {0}")]
    TransientIo(String),
}

impl StoreError {
    /// Whether this failure means the caller must sign in or switch identity
    pub fn is_auth(&self) -> bool {
        matches!(self, StoreError::NotAuthenticated | StoreError::Forbidden)
    }
}

impl From<FlashcardStorageError> for StoreError {
    fn from(err: FlashcardStorageError) -> Self {
        match err {
            FlashcardStorageError::CardNotFound(id) => StoreError::NotFound(id),
            other => StoreError::TransientIo(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent per-card error counters.
///
/// `increment_error` and `mark_reviewed` must be atomic per card and durable
/// by the time they return `Ok`.
#[async_trait]
pub trait ErrorCountStore: Send + Sync {
    /// Cards owned by `user_id` that belong in a pool of `mode`.
    /// An empty vector is a valid result.
    async fn fetch_pool(&self, user_id: UserId, mode: PoolMode) -> StoreResult<Vec<Card>>;

    /// Add exactly one to a card's error count, returning the new count
    async fn increment_error(&self, card_id: CardId) -> StoreResult<u32>;

    /// Set `reviewed`, clear the error count, and stamp the review time
    async fn mark_reviewed(&self, card_id: CardId) -> StoreResult<Card>;
}

/// Store backed by the local card files, acting for one caller.
#[derive(Clone)]
pub struct LocalCardStore {
    storage: Arc<Mutex<FlashcardStorage>>,
    caller: Option<UserId>,
}

impl LocalCardStore {
    pub fn new(storage: Arc<Mutex<FlashcardStorage>>, caller: Option<UserId>) -> Self {
        Self { storage, caller }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, FlashcardStorage>> {
        self.storage
            .lock()
            .map_err(|_| StoreError::TransientIo("card storage lock poisoned".to_string()))
    }

    fn caller(&self) -> StoreResult<UserId> {
        self.caller.ok_or(StoreError::NotAuthenticated)
    }

    /// Load a card, hiding cards the caller does not own
    fn owned_card(&self, storage: &FlashcardStorage, card_id: CardId) -> StoreResult<Card> {
        let caller = self.caller()?;
        let card = storage.get_card(card_id)?;
        if card.owner_id != caller {
            return Err(StoreError::NotFound(card_id));
        }
        Ok(card)
    }
}

#[async_trait]
impl ErrorCountStore for LocalCardStore {
    async fn fetch_pool(&self, user_id: UserId, mode: PoolMode) -> StoreResult<Vec<Card>> {
        if self.caller()? != user_id {
            return Err(StoreError::Forbidden);
        }
        let storage = self.lock()?;
        Ok(storage.fetch_pool(user_id, mode)?)
    }

    async fn increment_error(&self, card_id: CardId) -> StoreResult<u32> {
        let storage = self.lock()?;
        self.owned_card(&storage, card_id)?;
        Ok(storage.increment_error(card_id)?)
    }

    async fn mark_reviewed(&self, card_id: CardId) -> StoreResult<Card> {
        let storage = self.lock()?;
        self.owned_card(&storage, card_id)?;
        Ok(storage.mark_reviewed(card_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::NewCard;
    use tempfile::TempDir;

    fn shared_storage() -> (Arc<Mutex<FlashcardStorage>>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FlashcardStorage::new(temp_dir.path().to_path_buf());
        storage.init().unwrap();
        (Arc::new(Mutex::new(storage)), temp_dir)
    }

    fn add(storage: &Arc<Mutex<FlashcardStorage>>, owner: UserId, title: &str) -> Card {
        storage
            .lock()
            .unwrap()
            .create_card(
                owner,
                NewCard {
                    title: title.to_string(),
                    description: "back".to_string(),
                    ..Default::default()
                },
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_requires_identity() {
        let (storage, _temp) = shared_storage();
        let store = LocalCardStore::new(storage, None);

        let err = store.fetch_pool(1, PoolMode::All).await.unwrap_err();
        assert_eq!(err, StoreError::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_fetch_other_user_is_forbidden() {
        let (storage, _temp) = shared_storage();
        add(&storage, 2, "theirs");
        let store = LocalCardStore::new(storage, Some(1));

        let err = store.fetch_pool(2, PoolMode::All).await.unwrap_err();
        assert_eq!(err, StoreError::Forbidden);
    }

    #[tokio::test]
    async fn test_foreign_card_is_not_found() {
        let (storage, _temp) = shared_storage();
        let theirs = add(&storage, 2, "theirs");
        let store = LocalCardStore::new(Arc::clone(&storage), Some(1));

        assert_eq!(
            store.increment_error(theirs.id).await.unwrap_err(),
            StoreError::NotFound(theirs.id)
        );
        assert_eq!(
            store.mark_reviewed(theirs.id).await.unwrap_err(),
            StoreError::NotFound(theirs.id)
        );
        assert_eq!(storage.lock().unwrap().get_card(theirs.id).unwrap().error_count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let (storage, _temp) = shared_storage();
        let card_id = add(&storage, 1, "mine").id;
        let store = LocalCardStore::new(storage, Some(1));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment_error(card_id).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let pool = store.fetch_pool(1, PoolMode::ErrorsOnly).await.unwrap();
        assert_eq!(pool[0].error_count, 16);
    }

    #[test]
    fn test_storage_error_mapping() {
        assert_eq!(
            StoreError::from(FlashcardStorageError::CardNotFound(3)),
            StoreError::NotFound(3)
        );
        assert!(matches!(
            StoreError::from(FlashcardStorageError::DataDirNotFound),
            StoreError::TransientIo(_)
        ));
    }
}
