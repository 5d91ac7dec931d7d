// src/theme.rs
use crate::error::StorageError;
use crate::storage::{keys, Storage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedTheme {
    Light,
    Dark,
}

impl ThemePreference {
    pub fn resolve(self, system_prefers_dark: bool) -> ResolvedTheme {
        match self {
            ThemePreference::Light => ResolvedTheme::Light,
            ThemePreference::Dark => ResolvedTheme::Dark,
            ThemePreference::System if system_prefers_dark => ResolvedTheme::Dark,
            ThemePreference::System => ResolvedTheme::Light,
        }
    }
}

/// Persisted theme choice under [`keys::THEME`].
#[derive(Clone)]
pub struct ThemeStore {
    storage: Storage,
}

impl ThemeStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn get(&self) -> ThemePreference {
        self.storage.get(keys::THEME, ThemePreference::default())
    }

    pub fn set(&self, theme: ThemePreference) -> Result<(), StorageError> {
        self.storage.set(keys::THEME, &theme)
    }
}
