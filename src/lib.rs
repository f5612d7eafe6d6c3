use std::sync::{Arc, Mutex};

pub mod client;
pub mod config;
pub mod flashcards;
pub mod review;
pub mod server;

use config::AppConfig;
use flashcards::{FlashcardStorage, UserId};
use review::{ErrorCountStore, LocalCardStore};
use server::ServerState;

/// Shared handles built from a loaded configuration
pub struct AppState {
    pub config: AppConfig,
    pub storage: Arc<Mutex<FlashcardStorage>>,
}

impl AppState {
    /// Open (and create if needed) the card storage named by the config
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let data_dir = config.data_dir()?;
        let storage = FlashcardStorage::new(data_dir);
        storage.init()?;
        log::debug!("Card storage at {}", storage.base_path().display());

        Ok(Self {
            config,
            storage: Arc::new(Mutex::new(storage)),
        })
    }

    /// Store acting as `user_id` against local card files
    pub fn local_store(&self, user_id: UserId) -> Arc<dyn ErrorCountStore> {
        Arc::new(LocalCardStore::new(Arc::clone(&self.storage), Some(user_id)))
    }

    /// State for the card API server
    pub fn server_state(&self) -> anyhow::Result<ServerState> {
        Ok(ServerState {
            storage: Arc::clone(&self.storage),
            tokens: self.config.token_table()?,
        })
    }
}
