//! Card API handlers

use std::sync::{Arc, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::auth::Caller;
use super::error::ApiError;
use super::ServerState;
use crate::flashcards::{Card, CardId, CardPatch, FlashcardStorage, NewCard, PoolMode, TagCount, UserId};
use crate::review::StoreError;

type ApiResult<T> = Result<T, ApiError>;

/// Query parameters for listing a user's cards
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolQuery {
    #[serde(default)]
    pub mode: PoolMode,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Body of `PATCH /api/cards/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum CardMutation {
    /// Count one more missed review
    IncrementError,
    /// Mark reviewed, clearing the error count
    MarkReviewed,
}

fn lock(state: &ServerState) -> ApiResult<MutexGuard<'_, FlashcardStorage>> {
    state
        .storage
        .lock()
        .map_err(|_| StoreError::TransientIo("card storage lock poisoned".to_string()).into())
}

/// Load a card owned by the caller. Other users' cards look missing.
fn owned_card(storage: &FlashcardStorage, caller: Caller, card_id: CardId) -> ApiResult<Card> {
    let card = storage.get_card(card_id)?;
    if card.owner_id != caller.user_id {
        return Err(StoreError::NotFound(card_id).into());
    }
    Ok(card)
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn list_user_cards(
    State(state): State<Arc<ServerState>>,
    caller: Caller,
    Path(user_id): Path<UserId>,
    Query(query): Query<PoolQuery>,
) -> ApiResult<Json<Vec<Card>>> {
    caller.require(user_id)?;

    let storage = lock(&state)?;
    let mut cards = storage.fetch_pool(user_id, query.mode)?;
    if let Some(tag) = query.tag.as_deref().filter(|t| !t.is_empty()) {
        cards.retain(|c| c.has_tag(tag));
    }
    Ok(Json(cards))
}

pub async fn create_card(
    State(state): State<Arc<ServerState>>,
    caller: Caller,
    Json(input): Json<NewCard>,
) -> ApiResult<(StatusCode, Json<Card>)> {
    let storage = lock(&state)?;
    let card = storage.create_card(caller.user_id, input)?;
    log::info!("User {} created card {}", caller.user_id, card.id);
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn get_card(
    State(state): State<Arc<ServerState>>,
    caller: Caller,
    Path(card_id): Path<CardId>,
) -> ApiResult<Json<Card>> {
    let storage = lock(&state)?;
    Ok(Json(owned_card(&storage, caller, card_id)?))
}

pub async fn update_card(
    State(state): State<Arc<ServerState>>,
    caller: Caller,
    Path(card_id): Path<CardId>,
    Json(patch): Json<CardPatch>,
) -> ApiResult<Json<Card>> {
    let storage = lock(&state)?;
    owned_card(&storage, caller, card_id)?;
    Ok(Json(storage.update_card(card_id, patch)?))
}

pub async fn mutate_card(
    State(state): State<Arc<ServerState>>,
    caller: Caller,
    Path(card_id): Path<CardId>,
    Json(mutation): Json<CardMutation>,
) -> ApiResult<Json<Card>> {
    let storage = lock(&state)?;
    owned_card(&storage, caller, card_id)?;

    let card = match mutation {
        CardMutation::IncrementError => {
            storage.increment_error(card_id)?;
            storage.get_card(card_id)?
        }
        CardMutation::MarkReviewed => storage.mark_reviewed(card_id)?,
    };
    log::debug!(
        "User {} applied {:?} to card {} (error count {})",
        caller.user_id,
        mutation,
        card_id,
        card.error_count
    );
    Ok(Json(card))
}

pub async fn delete_card(
    State(state): State<Arc<ServerState>>,
    caller: Caller,
    Path(card_id): Path<CardId>,
) -> ApiResult<StatusCode> {
    let storage = lock(&state)?;
    owned_card(&storage, caller, card_id)?;
    storage.delete_card(card_id)?;
    log::info!("User {} deleted card {}", caller.user_id, card_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tags(
    State(state): State<Arc<ServerState>>,
    caller: Caller,
) -> ApiResult<Json<Vec<TagCount>>> {
    let storage = lock(&state)?;
    Ok(Json(storage.list_tags(caller.user_id)?))
}
