//! HTTP card API.
//!
//! Serves card CRUD plus the two error-count mutations over JSON. Every
//! `/api` route requires `Authorization: Bearer <token>`.

pub mod auth;
pub mod error;
pub mod handlers;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

use crate::flashcards::{FlashcardStorage, UserId};

pub use auth::{generate_token, Caller};
pub use error::ApiError;
pub use handlers::CardMutation;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Server state shared across requests.
pub struct ServerState {
    pub storage: Arc<Mutex<FlashcardStorage>>,
    /// Bearer token to user
    pub tokens: HashMap<String, UserId>,
}

/// Build the card API router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/users/{user_id}/cards", get(handlers::list_user_cards))
        .route("/api/cards", axum::routing::post(handlers::create_card))
        .route(
            "/api/cards/{id}",
            get(handlers::get_card)
                .put(handlers::update_card)
                .patch(handlers::mutate_card)
                .delete(handlers::delete_card),
        )
        .route("/api/tags", get(handlers::list_tags))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handle for a running card server.
pub struct CardServer {
    /// Port the server is listening on.
    pub port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl CardServer {
    /// Get the base URL for this server.
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Stop the server and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.task.await?;
        Ok(())
    }
}

/// Start the card server on `bind` (use port 0 for any free port).
pub async fn start_server(bind: &str, state: ServerState) -> Result<CardServer, ServerError> {
    let app = router(Arc::new(state));

    let listener = TcpListener::bind(bind).await?;
    let addr = listener.local_addr()?;

    log::info!("Card server listening on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                log::info!("Card server shutting down");
            })
            .await
        {
            log::error!("Card server error: {}", e);
        }
    });

    Ok(CardServer {
        port: addr.port(),
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
