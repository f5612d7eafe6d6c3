//! Async driver for a [`ReviewSession`].
//!
//! The engine owns one session and carries out the effects its transitions
//! request. Pool fetches are tagged with a generation number; a response is
//! applied only if no restart happened and the engine was not closed while it
//! was in flight. Error increments run as detached tasks: the session moves
//! on immediately and a failed increment is only logged.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::cache::PoolCache;
use super::session::{
    Effect, Judgment, ReviewSession, SessionEvent, SessionState, TransitionError,
};
use super::store::{ErrorCountStore, StoreResult};
use crate::flashcards::{Card, CardId, PoolMode, UserId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Review session was closed")]
    Closed,

    #[error("Pool response was superseded by a restart")]
    Superseded,

    #[error("Review session lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// What a presentation layer needs to draw the current card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub id: CardId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub error_count: u32,
    /// Back face, present only once the card is flipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_image_url: Option<String>,
}

impl CardView {
    fn new(card: &Card, flipped: bool) -> Self {
        Self {
            id: card.id,
            title: card.title.clone(),
            image_url: card.image_url.clone(),
            tags: card.tags.clone(),
            error_count: card.error_count,
            description: flipped.then(|| card.description.clone()),
            back_image_url: if flipped {
                card.back_image_url.clone()
            } else {
                None
            },
        }
    }
}

/// Point-in-time view of an engine's session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub user_id: UserId,
    pub mode: PoolMode,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardView>,
    /// 1-based position of the current card, 0 when no card is shown
    pub position: usize,
    pub pool_size: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
}

struct EngineInner {
    session: ReviewSession,
    generation: u64,
    closed: bool,
}

pub struct ReviewEngine {
    id: Uuid,
    store: Arc<dyn ErrorCountStore>,
    cache: Arc<Mutex<PoolCache>>,
    inner: Mutex<EngineInner>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl ReviewEngine {
    /// Create an engine with its own pool cache. Nothing is fetched until
    /// [`ReviewEngine::start`].
    pub fn new(store: Arc<dyn ErrorCountStore>, user_id: UserId, mode: PoolMode) -> Self {
        Self::with_cache(store, user_id, mode, Arc::new(Mutex::new(PoolCache::new())))
    }

    /// Create an engine sharing a pool cache with other engines
    pub fn with_cache(
        store: Arc<dyn ErrorCountStore>,
        user_id: UserId,
        mode: PoolMode,
        cache: Arc<Mutex<PoolCache>>,
    ) -> Self {
        let (session, _fetch) = ReviewSession::new(user_id, mode);
        Self {
            id: Uuid::new_v4(),
            store,
            cache,
            inner: Mutex::new(EngineInner {
                session,
                generation: 0,
                closed: false,
            }),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> Result<MutexGuard<'_, EngineInner>> {
        self.inner.lock().map_err(|_| EngineError::Poisoned)
    }

    fn lock_open(&self) -> Result<MutexGuard<'_, EngineInner>> {
        let inner = self.lock()?;
        if inner.closed {
            return Err(EngineError::Closed);
        }
        Ok(inner)
    }

    /// Load the initial pool, from the cache if an entry exists
    pub async fn start(&self) -> Result<SessionSnapshot> {
        let generation = self.lock_open()?.generation;
        log::debug!("Session {}: starting", self.id);
        self.load(generation, true).await
    }

    /// Discard all session state and fetch a fresh pool. Any fetch still in
    /// flight is superseded.
    pub async fn restart(&self) -> Result<SessionSnapshot> {
        let generation = {
            let mut inner = self.lock_open()?;
            inner.session.apply(SessionEvent::Restart)?;
            inner.generation += 1;
            if let Ok(mut cache) = self.cache.lock() {
                cache.invalidate(inner.session.user_id(), inner.session.mode());
            }
            inner.generation
        };
        log::debug!("Session {}: restarting (generation {})", self.id, generation);
        self.load(generation, false).await
    }

    async fn load(&self, generation: u64, use_cache: bool) -> Result<SessionSnapshot> {
        let (user_id, mode) = {
            let inner = self.lock()?;
            (inner.session.user_id(), inner.session.mode())
        };

        let cached = if use_cache {
            self.cache.lock().ok().and_then(|cache| cache.get(user_id, mode))
        } else {
            None
        };
        let from_cache = cached.is_some();

        let result = match cached {
            Some(cards) => Ok(cards),
            None => self.store.fetch_pool(user_id, mode).await,
        };

        let mut inner = self.lock()?;
        if inner.closed {
            log::debug!("Session {}: dropping pool response after close", self.id);
            return Err(EngineError::Closed);
        }
        if inner.generation != generation {
            log::debug!(
                "Session {}: dropping pool response for generation {} (now {})",
                self.id,
                generation,
                inner.generation
            );
            return Err(EngineError::Superseded);
        }

        let event = match result {
            Ok(cards) => {
                log::info!(
                    "Session {}: loaded {} {} cards for user {}{}",
                    self.id,
                    cards.len(),
                    mode.as_str(),
                    user_id,
                    if from_cache { " (cached)" } else { "" }
                );
                if !from_cache {
                    if let Ok(mut cache) = self.cache.lock() {
                        cache.insert(user_id, mode, cards.clone());
                    }
                }
                SessionEvent::PoolLoaded(cards)
            }
            Err(err) => {
                log::warn!("Session {}: failed to load pool: {}", self.id, err);
                SessionEvent::PoolFailed(err)
            }
        };

        inner.session.apply(event)?;
        Ok(self.snapshot_of(&inner))
    }

    /// Show the other face of the current card
    pub fn flip(&self) -> Result<SessionSnapshot> {
        let mut inner = self.lock_open()?;
        inner.session.apply(SessionEvent::Flip)?;
        Ok(self.snapshot_of(&inner))
    }

    /// Step back one card without judging
    pub fn previous(&self) -> Result<SessionSnapshot> {
        let mut inner = self.lock_open()?;
        inner.session.apply(SessionEvent::Previous)?;
        Ok(self.snapshot_of(&inner))
    }

    /// Judge the current card and advance. An incorrect judgment spawns a
    /// detached error increment; the returned snapshot never waits for it.
    pub async fn judge(&self, correct: bool) -> Result<SessionSnapshot> {
        let (effects, user_id, snapshot) = {
            let mut inner = self.lock_open()?;
            let effects = inner.session.apply(SessionEvent::Judge(Judgment::from(correct)))?;
            (effects, inner.session.user_id(), self.snapshot_of(&inner))
        };

        for effect in effects {
            match effect {
                Effect::IncrementError(card_id) => self.spawn_increment(user_id, card_id),
                Effect::FetchPool => {}
            }
        }

        Ok(snapshot)
    }

    fn spawn_increment(&self, user_id: UserId, card_id: CardId) {
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let session_id = self.id;

        let handle = tokio::spawn(async move {
            match store.increment_error(card_id).await {
                Ok(count) => {
                    log::debug!(
                        "Session {}: card {} error count now {}",
                        session_id,
                        card_id,
                        count
                    );
                    if let Ok(mut cache) = cache.lock() {
                        cache.invalidate_user(user_id);
                    }
                }
                Err(err) => {
                    log::warn!(
                        "Session {}: failed to record miss for card {}: {}",
                        session_id,
                        card_id,
                        err
                    );
                }
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    /// Wait for every detached error increment issued so far
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };
        for handle in handles {
            if let Err(err) = handle.await {
                log::warn!("Session {}: increment task failed: {}", self.id, err);
            }
        }
    }

    /// Explicitly mark a card reviewed. Never triggered by judgments.
    pub async fn mark_reviewed(&self, card_id: CardId) -> StoreResult<Card> {
        let card = self.store.mark_reviewed(card_id).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.invalidate_user(card.owner_id);
        }
        Ok(card)
    }

    /// Tear the session down. Late fetch responses are dropped; increments
    /// already issued still run to completion.
    pub fn close(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.closed = true;
            log::debug!("Session {}: closed", self.id);
        }
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        let inner = self.lock()?;
        Ok(self.snapshot_of(&inner))
    }

    fn snapshot_of(&self, inner: &EngineInner) -> SessionSnapshot {
        let session = &inner.session;
        let position = match session.state() {
            SessionState::Active { cursor, .. } => cursor + 1,
            _ => 0,
        };
        SessionSnapshot {
            session_id: self.id,
            user_id: session.user_id(),
            mode: session.mode(),
            state: session.state().clone(),
            card: session
                .current_card()
                .map(|card| CardView::new(card, session.is_flipped())),
            position,
            pool_size: session.pool().len(),
            correct_count: session.correct_count(),
            incorrect_count: session.incorrect_count(),
        }
    }
}
