//! Review sessions and smart review
//!
//! This module provides:
//! - The error-count store contract and its local implementation
//! - The review session state machine
//! - An async engine that drives a session against a store

pub mod cache;
pub mod engine;
pub mod session;
pub mod store;

pub use cache::PoolCache;
pub use engine::{CardView, EngineError, ReviewEngine, SessionSnapshot};
pub use session::{Effect, Judgment, ReviewSession, SessionEvent, SessionState, Summary};
pub use store::{ErrorCountStore, LocalCardStore, StoreError, StoreResult};
