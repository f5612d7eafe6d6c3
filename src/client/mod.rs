//! Card store that talks to a remote card server over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::flashcards::{Card, CardId, PoolMode, UserId};
use crate::review::{ErrorCountStore, StoreError, StoreResult};
use crate::server::CardMutation;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// HTTP client for a card server
pub struct HttpCardStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpCardStore {
    /// Create a new client. Without a token every call fails with
    /// `NotAuthenticated` on the server side.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ClientError> {
        // Normalize URL - ensure no trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidUrl(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        card_id: Option<CardId>,
    ) -> StoreResult<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StoreError::TransientIo(e.to_string()))?;

        let response = check_status(response, card_id).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::TransientIo(format!("invalid response body: {}", e)))
    }

    async fn mutate(&self, card_id: CardId, mutation: CardMutation) -> StoreResult<Card> {
        let request = self
            .client
            .patch(self.url(&format!("api/cards/{}", card_id)))
            .json(&mutation);
        self.send(request, Some(card_id)).await
    }
}

async fn check_status(response: Response, card_id: Option<CardId>) -> StoreResult<Response> {
    match (response.status(), card_id) {
        (status, _) if status.is_success() => Ok(response),
        (StatusCode::UNAUTHORIZED, _) => Err(StoreError::NotAuthenticated),
        (StatusCode::FORBIDDEN, _) => Err(StoreError::Forbidden),
        (StatusCode::NOT_FOUND, Some(id)) => Err(StoreError::NotFound(id)),
        (status, _) => {
            let message = response.text().await.unwrap_or_default();
            Err(StoreError::TransientIo(format!(
                "server returned {}: {}",
                status.as_u16(),
                message
            )))
        }
    }
}

#[async_trait]
impl ErrorCountStore for HttpCardStore {
    async fn fetch_pool(&self, user_id: UserId, mode: PoolMode) -> StoreResult<Vec<Card>> {
        let request = self
            .client
            .get(self.url(&format!("api/users/{}/cards", user_id)))
            .query(&[("mode", mode.as_str())]);
        self.send(request, None).await
    }

    async fn increment_error(&self, card_id: CardId) -> StoreResult<u32> {
        let card = self.mutate(card_id, CardMutation::IncrementError).await?;
        Ok(card.error_count)
    }

    async fn mark_reviewed(&self, card_id: CardId) -> StoreResult<Card> {
        self.mutate(card_id, CardMutation::MarkReviewed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::{FlashcardStorage, NewCard};
    use crate::review::ReviewEngine;
    use crate::review::SessionState;
    use crate::server::{start_server, CardServer, ServerState};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    async fn serve() -> (CardServer, Arc<Mutex<FlashcardStorage>>, TempDir) {
        let temp = TempDir::new().unwrap();
        let storage = FlashcardStorage::new(temp.path().to_path_buf());
        storage.init().unwrap();
        let storage = Arc::new(Mutex::new(storage));

        let mut tokens = HashMap::new();
        tokens.insert("alice-token".to_string(), 1);

        let server = start_server(
            "127.0.0.1:0",
            ServerState {
                storage: Arc::clone(&storage),
                tokens,
            },
        )
        .await
        .unwrap();
        (server, storage, temp)
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

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(
            HttpCardStore::new("ftp://cards", None),
            Err(ClientError::InvalidUrl(_))
        ));
        let store = HttpCardStore::new("http://localhost:7878/", None).unwrap();
        assert_eq!(store.url("/api/tags"), "http://localhost:7878/api/tags");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let (server, storage, _temp) = serve().await;
        let card = add(&storage, 2, "not alice's");

        let anonymous = HttpCardStore::new(&server.base_url(), None).unwrap();
        assert_eq!(
            anonymous.fetch_pool(1, PoolMode::All).await.unwrap_err(),
            StoreError::NotAuthenticated
        );

        let alice = HttpCardStore::new(&server.base_url(), Some("alice-token".to_string())).unwrap();
        assert_eq!(
            alice.fetch_pool(2, PoolMode::All).await.unwrap_err(),
            StoreError::Forbidden
        );
        assert_eq!(
            alice.increment_error(card.id).await.unwrap_err(),
            StoreError::NotFound(card.id)
        );
        assert!(alice.fetch_pool(1, PoolMode::All).await.unwrap().is_empty());

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        let (server, _storage, _temp) = serve().await;
        let base_url = server.base_url();
        server.shutdown().await.unwrap();

        let store = HttpCardStore::new(&base_url, Some("alice-token".to_string())).unwrap();
        assert!(matches!(
            store.fetch_pool(1, PoolMode::All).await,
            Err(StoreError::TransientIo(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_session_round_trip() {
        let (server, storage, _temp) = serve().await;
        let a = add(&storage, 1, "A");
        let b = add(&storage, 1, "B");

        let store = Arc::new(
            HttpCardStore::new(&server.base_url(), Some("alice-token".to_string())).unwrap(),
        );
        let engine = ReviewEngine::new(store.clone(), 1, PoolMode::All);
        engine.start().await.unwrap();
        engine.judge(true).await.unwrap();
        let done = engine.judge(false).await.unwrap();
        engine.flush().await;
        assert!(matches!(done.state, SessionState::Complete { .. }));

        let missed = store.fetch_pool(1, PoolMode::ErrorsOnly).await.unwrap();
        assert_eq!(missed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![b.id]);

        let reviewed = engine.mark_reviewed(b.id).await.unwrap();
        assert_eq!(reviewed.error_count, 0);
        assert!(store.fetch_pool(1, PoolMode::ErrorsOnly).await.unwrap().is_empty());
        assert_eq!(storage.lock().unwrap().get_card(a.id).unwrap().error_count, 0);

        server.shutdown().await.unwrap();
    }
}
