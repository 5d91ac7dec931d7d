// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to parse stored value for key '{key}': {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Errors surfaced by login and registration. The `Display` strings are
/// the messages shown to the user.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    DuplicateEmail,
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write export: {0}")]
    Export(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {var}")]
    Invalid { var: &'static str, value: String },
}
