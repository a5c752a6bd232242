//! Environment-backed runtime configuration for `cache-smoke`.

use std::{env, path::PathBuf};

use cache_core::DEFAULT_MAX_MESSAGES_PER_CHAT;
use thiserror::Error;

const DEFAULT_INGEST_BUFFER: usize = 64;
const DEFAULT_NOTIFY_BUFFER: usize = 256;

/// Runtime configuration used by the smoke app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    /// Per-chat cap applied by the cache.
    pub max_messages_per_chat: usize,
    /// Capacity of the ingest event queue.
    pub ingest_buffer: usize,
    /// Capacity of the change-notice broadcast.
    pub notify_buffer: usize,
    /// Optional JSON-lines event script. The built-in scenario runs when unset.
    pub script_path: Option<PathBuf>,
}

impl SmokeConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let max_messages_per_chat = parse_positive_usize(
            "CHATCACHE_MAX_MESSAGES_PER_CHAT",
            DEFAULT_MAX_MESSAGES_PER_CHAT,
            &mut lookup,
        )?;
        let ingest_buffer =
            parse_positive_usize("CHATCACHE_INGEST_BUFFER", DEFAULT_INGEST_BUFFER, &mut lookup)?;
        let notify_buffer =
            parse_positive_usize("CHATCACHE_NOTIFY_BUFFER", DEFAULT_NOTIFY_BUFFER, &mut lookup)?;
        let script_path = optional_trimmed_env("CHATCACHE_SCRIPT", &mut lookup).map(PathBuf::from);

        Ok(Self {
            max_messages_per_chat,
            ingest_buffer,
            notify_buffer,
            script_path,
        })
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed or is out of range.
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_positive_usize<F>(
    key: &'static str,
    default: usize,
    lookup: &mut F,
) -> Result<usize, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    let parsed = value
        .parse::<usize>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value: value.clone(),
            reason: err.to_string(),
        })?;
    if parsed == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "must be at least 1".to_owned(),
        });
    }
    Ok(parsed)
}
