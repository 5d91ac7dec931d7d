// src/config.rs
use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const MEMORY_STORAGE: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub login_latency: Duration,
    pub register_latency: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_latency: Duration::from_millis(1000),
            register_latency: Duration::from_millis(1500),
        }
    }
}

impl AuthConfig {
    /// No simulated latency at all.
    pub fn instant() -> Self {
        Self {
            login_latency: Duration::ZERO,
            register_latency: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Inclusive bounds of the simulated reply delay.
    pub reply_delay_min: Duration,
    pub reply_delay_max: Duration,
    pub rng_seed: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reply_delay_min: Duration::from_millis(1000),
            reply_delay_max: Duration::from_millis(3000),
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` keeps everything in memory.
    pub storage_path: Option<PathBuf>,
    pub storage_quota: Option<usize>,
    pub export_dir: PathBuf,
    pub bind_addr: String,
    pub auth: AuthConfig,
    pub chat: ChatConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_path = match lookup("CHATBOT_STORAGE_PATH") {
            Some(path) if path == MEMORY_STORAGE => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from("chatbot_storage.json")),
        };

        let millis = |var: &'static str, default: u64| -> Result<Duration, ConfigError> {
            Ok(Duration::from_millis(
                parse_var(&lookup, var)?.unwrap_or(default),
            ))
        };

        let auth = AuthConfig {
            login_latency: millis("CHATBOT_LOGIN_LATENCY_MS", 1000)?,
            register_latency: millis("CHATBOT_REGISTER_LATENCY_MS", 1500)?,
        };

        let chat = ChatConfig {
            reply_delay_min: millis("CHATBOT_REPLY_DELAY_MIN_MS", 1000)?,
            reply_delay_max: millis("CHATBOT_REPLY_DELAY_MAX_MS", 3000)?,
            rng_seed: parse_var(&lookup, "CHATBOT_RNG_SEED")?,
        };

        if chat.reply_delay_min > chat.reply_delay_max {
            return Err(ConfigError::Invalid {
                var: "CHATBOT_REPLY_DELAY_MIN_MS",
                value: chat.reply_delay_min.as_millis().to_string(),
            });
        }

        Ok(Self {
            storage_path,
            storage_quota: parse_var(&lookup, "CHATBOT_STORAGE_QUOTA_BYTES")?,
            export_dir: PathBuf::from(
                lookup("CHATBOT_EXPORT_DIR").unwrap_or_else(|| "exports".to_string()),
            ),
            bind_addr: lookup("CHATBOT_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string()),
            auth,
            chat,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.storage_path, Some(PathBuf::from("chatbot_storage.json")));
        assert_eq!(config.auth, AuthConfig::default());
        assert_eq!(config.chat, ChatConfig::default());
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.storage_quota, None);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CHATBOT_STORAGE_PATH", ":memory:"),
            ("CHATBOT_LOGIN_LATENCY_MS", "10"),
            ("CHATBOT_REPLY_DELAY_MAX_MS", "5000"),
            ("CHATBOT_RNG_SEED", "42"),
        ])
        .unwrap();
        assert_eq!(config.storage_path, None);
        assert_eq!(config.auth.login_latency, Duration::from_millis(10));
        assert_eq!(config.chat.reply_delay_max, Duration::from_millis(5000));
        assert_eq!(config.chat.rng_seed, Some(42));
    }

    #[test]
    fn test_malformed_number_names_variable() {
        let err = config_from(&[("CHATBOT_REGISTER_LATENCY_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("CHATBOT_REGISTER_LATENCY_MS"));
    }

    #[test]
    fn test_inverted_delay_bounds_rejected() {
        assert!(config_from(&[
            ("CHATBOT_REPLY_DELAY_MIN_MS", "4000"),
            ("CHATBOT_REPLY_DELAY_MAX_MS", "2000"),
        ])
        .is_err());
    }
}
