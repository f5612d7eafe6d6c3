//! Flashcard persistence for Flashdeck
//!
//! This module provides:
//! - Card CRUD with tags and opaque image URLs
//! - Per-card error counting that feeds smart review
//! - Pool selection for review sessions

pub mod models;
pub mod storage;

pub use models::*;
pub use storage::{FlashcardStorage, FlashcardStorageError};
