//! Storage operations for flashcards
//!
//! Directory structure under the data directory:
//! ```text
//! {data_dir}/
//! └── cards/
//!     └── {card-id}.json   # Individual card files
//! ```
//!
//! `FlashcardStorage` itself does no locking. Callers that share it across
//! tasks keep it behind a mutex so that each read-modify-write is atomic.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

use super::models::*;

#[derive(Error, Debug)]
pub enum FlashcardStorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Card not found: {0}")]
    CardNotFound(CardId),

    #[error("Invalid card: {0}")]
    Validation(String),

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, FlashcardStorageError>;

/// Storage manager for flashcard operations
pub struct FlashcardStorage {
    /// Base path (e.g., ~/.local/share/flashdeck)
    base_path: PathBuf,
}

impl FlashcardStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("flashdeck"))
            .ok_or(FlashcardStorageError::DataDirNotFound)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn cards_dir(&self) -> PathBuf {
        self.base_path.join("cards")
    }

    fn card_path(&self, card_id: CardId) -> PathBuf {
        self.cards_dir().join(format!("{}.json", card_id))
    }

    /// Initialize storage directories
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.cards_dir())?;
        Ok(())
    }

    fn write_card(&self, card: &Card) -> Result<()> {
        let path = self.card_path(card.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(card)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Card>> {
        let cards_dir = self.cards_dir();
        if !cards_dir.exists() {
            return Ok(Vec::new());
        }

        let mut cards = Vec::new();
        for entry in fs::read_dir(&cards_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(&path)?;
                let card: Card = serde_json::from_str(&content)?;
                cards.push(card);
            }
        }

        cards.sort_by_key(|c| c.id);
        Ok(cards)
    }

    fn next_id(&self) -> Result<CardId> {
        Ok(self.read_all()?.last().map_or(1, |c| c.id + 1))
    }

    // ==================== Card Operations ====================

    /// List all cards owned by a user, ordered by id
    pub fn list_cards(&self, owner_id: UserId) -> Result<Vec<Card>> {
        let mut cards = self.read_all()?;
        cards.retain(|c| c.owner_id == owner_id);
        Ok(cards)
    }

    /// List a user's cards carrying a tag (case-insensitive)
    pub fn list_cards_by_tag(&self, owner_id: UserId, tag: &str) -> Result<Vec<Card>> {
        let mut cards = self.list_cards(owner_id)?;
        cards.retain(|c| c.has_tag(tag));
        Ok(cards)
    }

    /// Get a specific card
    pub fn get_card(&self, card_id: CardId) -> Result<Card> {
        let card_path = self.card_path(card_id);
        if !card_path.exists() {
            return Err(FlashcardStorageError::CardNotFound(card_id));
        }

        let content = fs::read_to_string(&card_path)?;
        let card: Card = serde_json::from_str(&content)?;
        Ok(card)
    }

    /// Create a new card
    pub fn create_card(&self, owner_id: UserId, input: NewCard) -> Result<Card> {
        self.init()?;

        let title = required_text("title", &input.title)?;
        let description = required_text("description", &input.description)?;

        let mut card = Card::new(self.next_id()?, owner_id, title, description);
        card.image_url = optional_url(input.image_url);
        card.back_image_url = optional_url(input.back_image_url);
        card.tags = normalize_tags(input.tags);

        self.write_card(&card)?;
        log::debug!("Created card {} for user {}", card.id, owner_id);
        Ok(card)
    }

    /// Apply a partial update to a card's content
    pub fn update_card(&self, card_id: CardId, patch: CardPatch) -> Result<Card> {
        let mut card = self.get_card(card_id)?;

        if let Some(title) = patch.title {
            card.title = required_text("title", &title)?;
        }
        if let Some(description) = patch.description {
            card.description = required_text("description", &description)?;
        }
        if let Some(image_url) = patch.image_url {
            card.image_url = optional_url(image_url);
        }
        if let Some(back_image_url) = patch.back_image_url {
            card.back_image_url = optional_url(back_image_url);
        }
        if let Some(tags) = patch.tags {
            card.tags = normalize_tags(tags);
        }

        card.updated_at = Utc::now();
        self.write_card(&card)?;
        Ok(card)
    }

    /// Delete a card
    pub fn delete_card(&self, card_id: CardId) -> Result<()> {
        let card_path = self.card_path(card_id);
        if !card_path.exists() {
            return Err(FlashcardStorageError::CardNotFound(card_id));
        }
        fs::remove_file(&card_path)?;
        Ok(())
    }

    /// Tags used by a user's cards, most used first
    pub fn list_tags(&self, owner_id: UserId) -> Result<Vec<TagCount>> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for card in self.list_cards(owner_id)? {
            for tag in card.tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }

        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        Ok(tags)
    }

    // ==================== Review Operations ====================

    /// Cards a review session for this user and mode would walk
    pub fn fetch_pool(&self, owner_id: UserId, mode: PoolMode) -> Result<Vec<Card>> {
        let mut cards = self.list_cards(owner_id)?;
        cards.retain(|c| mode.admits(c));
        Ok(cards)
    }

    /// Record one missed review, returning the new error count
    pub fn increment_error(&self, card_id: CardId) -> Result<u32> {
        let mut card = self.get_card(card_id)?;
        card.error_count = card.error_count.saturating_add(1);
        card.updated_at = Utc::now();
        self.write_card(&card)?;
        Ok(card.error_count)
    }

    /// Mark a card reviewed, clearing its error count
    pub fn mark_reviewed(&self, card_id: CardId) -> Result<Card> {
        let mut card = self.get_card(card_id)?;
        let now = Utc::now();
        card.reviewed = true;
        card.error_count = 0;
        card.last_reviewed_at = Some(now);
        card.updated_at = now;
        self.write_card(&card)?;
        Ok(card)
    }
}

fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FlashcardStorageError::Validation(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(trimmed.to_string())
}

fn optional_url(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

/// Trim tags, drop empty ones, and keep the first spelling of duplicates
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (FlashcardStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FlashcardStorage::new(temp_dir.path().to_path_buf());
        storage.init().unwrap();
        (storage, temp_dir)
    }

    fn new_card(title: &str) -> NewCard {
        NewCard {
            title: title.to_string(),
            description: format!("{} back", title),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_get_card() {
        let (storage, _temp) = create_test_storage();

        let created = storage
            .create_card(
                1,
                NewCard {
                    title: "  Capital of France ".to_string(),
                    description: "Paris".to_string(),
                    image_url: Some("https://img.example/eiffel.png".to_string()),
                    back_image_url: Some("   ".to_string()),
                    tags: vec!["geo".to_string(), " Geo ".to_string(), "".to_string()],
                },
            )
            .unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.title, "Capital of France");
        assert_eq!(created.error_count, 0);
        assert!(!created.reviewed);
        assert_eq!(created.back_image_url, None);
        assert_eq!(created.tags, vec!["geo".to_string()]);

        let retrieved = storage.get_card(created.id).unwrap();
        assert_eq!(retrieved, created);
    }

    #[test]
    fn test_create_rejects_empty_faces() {
        let (storage, _temp) = create_test_storage();

        let err = storage.create_card(1, new_card("   ")).unwrap_err();
        assert!(matches!(err, FlashcardStorageError::Validation(_)));

        let err = storage
            .create_card(
                1,
                NewCard {
                    title: "Front".to_string(),
                    description: String::new(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, FlashcardStorageError::Validation(_)));
    }

    #[test]
    fn test_list_cards_is_per_owner_and_ordered() {
        let (storage, _temp) = create_test_storage();

        storage.create_card(1, new_card("a")).unwrap();
        storage.create_card(2, new_card("b")).unwrap();
        storage.create_card(1, new_card("c")).unwrap();

        let cards = storage.list_cards(1).unwrap();
        let ids: Vec<CardId> = cards.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(storage.list_cards(2).unwrap().len(), 1);
        assert!(storage.list_cards(3).unwrap().is_empty());
    }

    #[test]
    fn test_errors_only_pool_excludes_clean_cards() {
        let (storage, _temp) = create_test_storage();

        let a = storage.create_card(1, new_card("A")).unwrap();
        let b = storage.create_card(1, new_card("B")).unwrap();
        storage.increment_error(b.id).unwrap();
        storage.increment_error(b.id).unwrap();

        let pool = storage.fetch_pool(1, PoolMode::ErrorsOnly).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, b.id);
        assert_eq!(pool[0].error_count, 2);

        let all = storage.fetch_pool(1, PoolMode::All).unwrap();
        assert_eq!(all.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a.id, b.id]);
    }

    #[test]
    fn test_mark_reviewed_resets_error_count() {
        let (storage, _temp) = create_test_storage();

        let card = storage.create_card(1, new_card("A")).unwrap();
        assert_eq!(storage.increment_error(card.id).unwrap(), 1);
        assert_eq!(storage.increment_error(card.id).unwrap(), 2);

        let reviewed = storage.mark_reviewed(card.id).unwrap();
        assert!(reviewed.reviewed);
        assert_eq!(reviewed.error_count, 0);
        assert!(reviewed.last_reviewed_at.is_some());

        assert!(storage.fetch_pool(1, PoolMode::ErrorsOnly).unwrap().is_empty());
    }

    #[test]
    fn test_missing_card_errors() {
        let (storage, _temp) = create_test_storage();

        assert!(matches!(
            storage.increment_error(42),
            Err(FlashcardStorageError::CardNotFound(42))
        ));
        assert!(matches!(
            storage.mark_reviewed(42),
            Err(FlashcardStorageError::CardNotFound(42))
        ));
        assert!(matches!(
            storage.delete_card(42),
            Err(FlashcardStorageError::CardNotFound(42))
        ));
    }

    #[test]
    fn test_update_card_patch() {
        let (storage, _temp) = create_test_storage();

        let mut input = new_card("Old");
        input.image_url = Some("https://img.example/old.png".to_string());
        let card = storage.create_card(1, input).unwrap();
        storage.increment_error(card.id).unwrap();

        let updated = storage
            .update_card(
                card.id,
                CardPatch {
                    title: Some("New".to_string()),
                    image_url: Some(None),
                    tags: Some(vec!["x".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "New");
        assert_eq!(updated.description, "Old back");
        assert_eq!(updated.image_url, None);
        assert_eq!(updated.tags, vec!["x".to_string()]);
        // Content edits leave review accounting alone
        assert_eq!(updated.error_count, 1);
    }

    #[test]
    fn test_delete_and_reuse_of_ids() {
        let (storage, _temp) = create_test_storage();

        let a = storage.create_card(1, new_card("A")).unwrap();
        let b = storage.create_card(1, new_card("B")).unwrap();
        storage.delete_card(a.id).unwrap();

        assert!(storage.get_card(a.id).is_err());
        let c = storage.create_card(1, new_card("C")).unwrap();
        assert_eq!(c.id, b.id + 1);
    }

    #[test]
    fn test_tags_counted_and_filtered() {
        let (storage, _temp) = create_test_storage();

        let mut one = new_card("one");
        one.tags = vec!["verbs".to_string(), "spanish".to_string()];
        let mut two = new_card("two");
        two.tags = vec!["spanish".to_string()];
        storage.create_card(1, one).unwrap();
        storage.create_card(1, two).unwrap();

        let tags = storage.list_tags(1).unwrap();
        assert_eq!(
            tags,
            vec![
                TagCount { tag: "spanish".to_string(), count: 2 },
                TagCount { tag: "verbs".to_string(), count: 1 },
            ]
        );

        let verbs = storage.list_cards_by_tag(1, "VERBS").unwrap();
        assert_eq!(verbs.len(), 1);
        assert_eq!(verbs[0].title, "one");
    }
}
