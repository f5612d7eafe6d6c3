//! Bearer-token caller identity.
//!
//! Tokens are issued elsewhere; the server only resolves them against the
//! configured token table.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use rand::Rng;

use super::error::ApiError;
use super::ServerState;
use crate::flashcards::UserId;
use crate::review::StoreError;

/// The authenticated user making a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
}

impl Caller {
    /// Reject access to another user's scope
    pub fn require(&self, user_id: UserId) -> Result<(), ApiError> {
        if self.user_id != user_id {
            return Err(StoreError::Forbidden.into());
        }
        Ok(())
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

impl FromRequestParts<Arc<ServerState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(StoreError::NotAuthenticated)?;
        state
            .tokens
            .get(token)
            .map(|&user_id| Caller { user_id })
            .ok_or_else(|| StoreError::NotAuthenticated.into())
    }
}

/// Random token for a server started without any configured users
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
