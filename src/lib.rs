// lib.rs - Library root: state containers plus the HTTP host around them
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod responder;
pub mod storage;
pub mod theme;
pub mod token;
pub mod utils;
pub mod validation;

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::AuthManager;
use crate::chat::ConversationStore;
use crate::config::AppConfig;
use crate::error::StorageError;
use crate::identity::IdentityStore;
use crate::storage::{FileStore, MemoryStore, Storage};
use crate::theme::ThemeStore;

// AppState holds one handle per state container; each owns disjoint storage keys
pub struct AppState {
    pub storage: Storage,
    pub identities: Arc<IdentityStore>,
    pub auth: Arc<AuthManager>,
    pub chat: Arc<ConversationStore>,
    pub theme: ThemeStore,
    pub export_dir: PathBuf,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self, StorageError> {
        let storage = match (&config.storage_path, config.storage_quota) {
            (Some(path), Some(quota)) => Storage::new(FileStore::open(path)?.with_quota(quota)),
            (Some(path), None) => Storage::new(FileStore::open(path)?),
            (None, Some(quota)) => Storage::new(MemoryStore::with_quota(quota)),
            (None, None) => Storage::in_memory(),
        };
        Ok(Self::with_storage(storage, config))
    }

    pub fn with_storage(storage: Storage, config: &AppConfig) -> Self {
        let identities = Arc::new(IdentityStore::new(storage.clone()));
        let auth = Arc::new(AuthManager::new(
            storage.clone(),
            identities.clone(),
            config.auth.clone(),
        ));
        let chat = Arc::new(ConversationStore::new(storage.clone(), config.chat.clone()));

        Self {
            theme: ThemeStore::new(storage.clone()),
            storage,
            identities,
            auth,
            chat,
            export_dir: config.export_dir.clone(),
        }
    }
}
