use std::path::Path;
use std::sync::{Arc, MutexGuard};

use anyhow::{anyhow, bail, Context, Result};

use flashdeck_lib::client::HttpCardStore;
use flashdeck_lib::config::AppConfig;
use flashdeck_lib::flashcards::{Card, CardId, FlashcardStorage, UserId};
use flashdeck_lib::review::ErrorCountStore;
use flashdeck_lib::AppState;

/// Shared application state for CLI commands
pub struct App {
    pub state: AppState,
    pub user_id: UserId,
    pub remote: bool,
}

impl App {
    pub fn new(config_path: Option<&Path>, user: Option<UserId>, remote: bool) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => AppConfig::default_path().context("Failed to locate config directory")?,
        };
        let config = AppConfig::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
        let user_id = user.unwrap_or(config.default_user);

        let state = AppState::new(config).context("Failed to open card storage")?;

        Ok(Self {
            state,
            user_id,
            remote,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.config
    }

    /// The error-count store this invocation talks to
    pub fn store(&self) -> Result<Arc<dyn ErrorCountStore>> {
        if !self.remote {
            return Ok(self.state.local_store(self.user_id));
        }

        let remote = &self.config().remote;
        let base_url = remote
            .base_url
            .as_deref()
            .context("--remote needs [remote] base_url in the config")?;
        let token = remote
            .token
            .clone()
            .or_else(|| self.config().token_for(self.user_id).map(str::to_string));
        let store = HttpCardStore::new(base_url, token)?;
        Ok(Arc::new(store))
    }

    /// Lock local card storage for direct edits
    pub fn storage(&self) -> Result<MutexGuard<'_, FlashcardStorage>> {
        if self.remote {
            bail!("This command only works on local cards; drop --remote");
        }
        self.state
            .storage
            .lock()
            .map_err(|_| anyhow!("Card storage lock poisoned"))
    }

    /// Load a card owned by the current user
    pub fn find_card(&self, card_id: CardId) -> Result<Card> {
        let card = self
            .storage()?
            .get_card(card_id)
            .with_context(|| format!("No card with id {}", card_id))?;
        if card.owner_id != self.user_id {
            bail!("No card with id {}", card_id);
        }
        Ok(card)
    }
}
