//! Review session state machine.
//!
//! A session walks a fixed pool of cards front to back. Every input goes
//! through [`ReviewSession::apply`], which either rejects the event and leaves
//! the session untouched, or updates the state and returns the side effects
//! the driver must carry out.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::store::StoreError;
use crate::flashcards::{Card, CardId, PoolMode, UserId};

/// A user's verdict on one card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Judgment {
    Correct,
    Incorrect,
}

impl From<bool> for Judgment {
    fn from(correct: bool) -> Self {
        if correct {
            Judgment::Correct
        } else {
            Judgment::Incorrect
        }
    }
}

/// Final tallies of a finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionState {
    /// Waiting for the pool
    Loading,
    /// Showing `pool[cursor]`; `flipped` is true once the back face is shown
    Active { cursor: usize, flipped: bool },
    /// The pool came back with no cards
    Empty,
    /// Every card has been judged once
    Complete { summary: Summary },
    /// The pool could not be fetched
    Error { reason: StoreError },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::Active { .. } => "active",
            SessionState::Empty => "empty",
            SessionState::Complete { .. } => "complete",
            SessionState::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Empty | SessionState::Complete { .. } | SessionState::Error { .. }
        )
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PoolLoaded(Vec<Card>),
    PoolFailed(StoreError),
    Flip,
    Judge(Judgment),
    Previous,
    Restart,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::PoolLoaded(_) => "poolLoaded",
            SessionEvent::PoolFailed(_) => "poolFailed",
            SessionEvent::Flip => "flip",
            SessionEvent::Judge(_) => "judge",
            SessionEvent::Previous => "previous",
            SessionEvent::Restart => "restart",
        }
    }
}

/// Side effects requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Fetch a fresh pool for the session's user and mode
    FetchPool,
    /// Ask the store to count one more miss for this card
    IncrementError(CardId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot {event} while {state}")]
    NotAllowed {
        state: &'static str,
        event: &'static str,
    },
}

/// One walk through a pool of cards
#[derive(Debug, Clone)]
pub struct ReviewSession {
    user_id: UserId,
    mode: PoolMode,
    pool: Vec<Card>,
    answered: HashMap<CardId, Judgment>,
    state: SessionState,
}

impl ReviewSession {
    /// Create a session in `Loading`. The caller owes the initial fetch.
    pub fn new(user_id: UserId, mode: PoolMode) -> (Self, Effect) {
        let session = Self {
            user_id,
            mode,
            pool: Vec::new(),
            answered: HashMap::new(),
            state: SessionState::Loading,
        };
        (session, Effect::FetchPool)
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn mode(&self) -> PoolMode {
        self.mode
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The loaded pool. Empty unless the session is `Active` or `Complete`.
    pub fn pool(&self) -> &[Card] {
        &self.pool
    }

    pub fn answered(&self) -> &HashMap<CardId, Judgment> {
        &self.answered
    }

    /// The card under the cursor while `Active`
    pub fn current_card(&self) -> Option<&Card> {
        match self.state {
            SessionState::Active { cursor, .. } => self.pool.get(cursor),
            _ => None,
        }
    }

    pub fn is_flipped(&self) -> bool {
        matches!(self.state, SessionState::Active { flipped: true, .. })
    }

    pub fn correct_count(&self) -> usize {
        self.count(Judgment::Correct)
    }

    pub fn incorrect_count(&self) -> usize {
        self.count(Judgment::Incorrect)
    }

    fn count(&self, judgment: Judgment) -> usize {
        let n = self.answered.values().filter(|j| **j == judgment).count();
        n.min(self.pool.len())
    }

    fn summary(&self) -> Summary {
        Summary {
            correct_count: self.correct_count(),
            incorrect_count: self.incorrect_count(),
            total: self.pool.len(),
        }
    }

    fn reject(&self, event: &SessionEvent) -> TransitionError {
        TransitionError::NotAllowed {
            state: self.state.name(),
            event: event.name(),
        }
    }

    /// The single transition function.
    pub fn apply(&mut self, event: SessionEvent) -> Result<Vec<Effect>, TransitionError> {
        match (&self.state, event) {
            (_, SessionEvent::Restart) => {
                self.pool.clear();
                self.answered.clear();
                self.state = SessionState::Loading;
                Ok(vec![Effect::FetchPool])
            }

            (SessionState::Loading, SessionEvent::PoolLoaded(cards)) => {
                self.answered.clear();
                if cards.is_empty() {
                    self.pool.clear();
                    self.state = SessionState::Empty;
                } else {
                    self.pool = cards;
                    self.state = SessionState::Active {
                        cursor: 0,
                        flipped: false,
                    };
                }
                Ok(Vec::new())
            }

            (SessionState::Loading, SessionEvent::PoolFailed(reason)) => {
                self.pool.clear();
                self.state = SessionState::Error { reason };
                Ok(Vec::new())
            }

            (&SessionState::Active { cursor, flipped }, SessionEvent::Flip) => {
                self.state = SessionState::Active {
                    cursor,
                    flipped: !flipped,
                };
                Ok(Vec::new())
            }

            (&SessionState::Active { cursor, .. }, SessionEvent::Judge(judgment)) => {
                let card_id = self.pool[cursor].id;
                self.answered.insert(card_id, judgment);

                let next = cursor + 1;
                self.state = if next < self.pool.len() {
                    SessionState::Active {
                        cursor: next,
                        flipped: false,
                    }
                } else {
                    SessionState::Complete {
                        summary: self.summary(),
                    }
                };

                Ok(match judgment {
                    Judgment::Incorrect => vec![Effect::IncrementError(card_id)],
                    Judgment::Correct => Vec::new(),
                })
            }

            (&SessionState::Active { cursor, .. }, SessionEvent::Previous) => {
                self.state = SessionState::Active {
                    cursor: cursor.saturating_sub(1),
                    flipped: false,
                };
                Ok(Vec::new())
            }

            (_, event) => Err(self.reject(&event)),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} correct, {} incorrect, {} total",
            self.correct_count, self.incorrect_count, self.total
        )
    }
}
