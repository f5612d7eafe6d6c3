//! Data models for the flashcard system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a stored card
pub type CardId = i64;

/// Identifier of a card owner
pub type UserId = i64;

/// A flashcard with a front (title) and back (description) face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub owner_id: UserId,
    /// Front-face text
    pub title: String,
    /// Back-face text
    pub description: String,
    /// Opaque URL of an externally hosted front image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Opaque URL of an externally hosted back image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Times this card was judged incorrect since it was last marked reviewed
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub reviewed: bool,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(id: CardId, owner_id: UserId, title: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id,
            title,
            description,
            image_url: None,
            back_image_url: None,
            tags: Vec::new(),
            error_count: 0,
            reviewed: false,
            last_reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Which cards a review pool is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PoolMode {
    /// Every card owned by the user
    #[default]
    All,
    /// Smart review: only cards that have been missed at least once
    ErrorsOnly,
}

impl PoolMode {
    /// Whether a card belongs in a pool of this mode
    pub fn admits(self, card: &Card) -> bool {
        match self {
            PoolMode::All => true,
            PoolMode::ErrorsOnly => card.error_count > 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PoolMode::All => "all",
            PoolMode::ErrorsOnly => "errorsOnly",
        }
    }
}

/// Input for creating a card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub back_image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of a card's content.
///
/// Image fields use a double option: `Some(None)` clears the URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub back_image_url: Option<Option<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Number of cards carrying a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Distinguishes an absent field from an explicit `null`
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_serializes_camel_case() {
        let mut card = Card::new(7, 1, "Front".to_string(), "Back".to_string());
        card.image_url = Some("https://img.example/a.png".to_string());
        card.error_count = 2;

        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["imageUrl"], "https://img.example/a.png");
        assert_eq!(json["errorCount"], 2);
        assert_eq!(json["ownerId"], 1);
        assert!(json.get("backImageUrl").is_none());
        assert!(json["lastReviewedAt"].is_null());
    }

    #[test]
    fn test_pool_mode_admits() {
        let mut card = Card::new(1, 1, "a".to_string(), "b".to_string());
        assert!(PoolMode::All.admits(&card));
        assert!(!PoolMode::ErrorsOnly.admits(&card));

        card.error_count = 1;
        assert!(PoolMode::ErrorsOnly.admits(&card));
    }

    #[test]
    fn test_pool_mode_wire_names() {
        assert_eq!(serde_json::to_string(&PoolMode::ErrorsOnly).unwrap(), "\"errorsOnly\"");
        let mode: PoolMode = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(mode, PoolMode::All);
    }

    #[test]
    fn test_patch_distinguishes_null_from_missing() {
        let patch: CardPatch = serde_json::from_str(r#"{"imageUrl": null}"#).unwrap();
        assert_eq!(patch.image_url, Some(None));
        assert_eq!(patch.back_image_url, None);
        assert!(patch.title.is_none());
    }
}
