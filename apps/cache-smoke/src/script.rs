//! Event feed for the smoke run: JSON-lines scripts or the built-in scenario.

use std::{
    fs,
    path::{Path, PathBuf},
};

use cache_core::{CacheEvent, CacheOp, ChatMessage, DeliveryStatus};
use thiserror::Error;

const SCENARIO_BASE_TS_MS: u64 = 1_731_000_000_000;

/// Errors produced while loading an event script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed reading event script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid event on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Read and parse a JSON-lines event script.
pub fn load_script(path: &Path) -> Result<Vec<CacheEvent<ChatMessage>>, ScriptError> {
    let raw = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&raw)
}

/// Parse one `CacheEvent` per line. Blank lines and `#` comments are skipped.
pub fn parse_script(raw: &str) -> Result<Vec<CacheEvent<ChatMessage>>, ScriptError> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| ScriptError::Parse {
                line: index + 1,
                source,
            })
        })
        .collect()
}

/// Initial load, pagination, live updates and a chat switch across two chats.
pub fn builtin_scenario() -> Vec<CacheEvent<ChatMessage>> {
    vec![
        CacheEvent::ActiveChatChanged {
            chat_id: "alice".into(),
        },
        CacheEvent::ChatDelta {
            chat_id: "alice".into(),
            ops: vec![CacheOp::SetMessages(
                (1..=50).map(|n| message("m", n, "@alice:example.org")).collect(),
            )],
        },
        CacheEvent::ChatDelta {
            chat_id: "alice".into(),
            ops: vec![CacheOp::Prepend(
                (1..=30)
                    .map(|n| message("older", n, "@alice:example.org"))
                    .collect(),
            )],
        },
        CacheEvent::ChatDelta {
            chat_id: "bob".into(),
            ops: vec![
                CacheOp::Upsert(message("b", 1, "@me:example.org")),
                CacheOp::Upsert(ChatMessage {
                    status: DeliveryStatus::Delivered,
                    ..message("b", 1, "@me:example.org")
                }),
                CacheOp::Append(message("b", 2, "@bob:example.org")),
            ],
        },
        CacheEvent::ActiveChatChanged {
            chat_id: "bob".into(),
        },
    ]
}

fn message(prefix: &str, n: u64, sender: &str) -> ChatMessage {
    ChatMessage {
        id: Some(format!("{prefix}{n}")),
        sender: sender.to_owned(),
        body: format!("{prefix} message {n}"),
        status: DeliveryStatus::Sent,
        timestamp_ms: SCENARIO_BASE_TS_MS + n * 1_000,
    }
}
