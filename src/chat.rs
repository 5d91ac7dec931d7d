// src/chat.rs
//! Conversation state: the message log, the typing indicator and the
//! input-history ring used for up/down recall.
//!
//! Overlapping sends are not serialized. Both user messages land
//! immediately and each reply lands when its own timer fires, so turns can
//! interleave in the log. Every reply records the id of the message it
//! answers in `reply_to`, and the typing flag stays up until the last
//! pending reply has arrived.

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::models::chat::{
    ChatStatus, ExportFormat, HistoryDirection, Message, Rating, Turn,
};
use crate::responder::generate_response;
use crate::storage::{keys, Storage};
use crate::utils::{export_date, format_local_timestamp};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const INPUT_HISTORY_LIMIT: usize = 50;

struct ChatState {
    messages: Vec<Message>,
    input_history: Vec<String>,
    /// -1 while not browsing the input history.
    history_index: i32,
    pending_replies: usize,
}

/// A sent message whose reply has been drawn but not delivered yet.
pub struct PendingReply {
    pub user: Message,
    delay: Duration,
    content: &'static str,
}

/// A transcript ready to be handed to the user as a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub content_type: &'static str,
    pub content: String,
}

impl ExportArtifact {
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ChatError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.content)?;
        Ok(path)
    }
}

pub struct ConversationStore {
    storage: Storage,
    config: ChatConfig,
    rng: Mutex<StdRng>,
    state: Mutex<ChatState>,
}

impl ConversationStore {
    pub fn new(storage: Storage, config: ChatConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(storage, config, rng)
    }

    pub fn with_rng(storage: Storage, config: ChatConfig, rng: StdRng) -> Self {
        let messages: Vec<Message> = storage.get(keys::CHAT_HISTORY, Vec::new());
        let input_history: Vec<String> = storage.get(keys::INPUT_HISTORY, Vec::new());
        tracing::debug!(
            messages = messages.len(),
            input_history = input_history.len(),
            "loaded conversation"
        );

        Self {
            storage,
            config,
            rng: Mutex::new(rng),
            state: Mutex::new(ChatState {
                messages,
                input_history,
                history_index: -1,
                pending_replies: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, key: &str, value: &[impl serde::Serialize]) {
        if let Err(e) = self.storage.set(key, value) {
            tracing::warn!(key, error = %e, "failed to persist conversation state");
        }
    }

    /// Sends `content` and waits for the simulated reply.
    ///
    /// Blank content is not rejected here; callers guard against it.
    pub async fn send(&self, content: &str) -> Turn {
        let pending = self.begin_turn(content);
        tokio::time::sleep(pending.delay).await;
        self.finish_turn(pending)
    }

    /// Like [`send`](Self::send) but delivers the reply in the background,
    /// returning the user message as soon as it is in the log.
    pub fn send_detached(self: &Arc<Self>, content: &str) -> Message {
        let pending = self.begin_turn(content);
        let user = pending.user.clone();
        let store = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(pending.delay).await;
            store.finish_turn(pending);
        });
        user
    }

    pub fn begin_turn(&self, content: &str) -> PendingReply {
        let user = Message::new_user(content.to_string());

        let (delay, reply) = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            let min = self.config.reply_delay_min.as_millis() as u64;
            let max = (self.config.reply_delay_max.as_millis() as u64).max(min);
            let delay = Duration::from_millis(rng.gen_range(min..=max));
            (delay, generate_response(&mut *rng))
        };

        let mut state = self.state();
        state.messages.push(user.clone());
        record_input(&mut state.input_history, content);
        state.history_index = -1;
        state.pending_replies += 1;
        self.persist(keys::CHAT_HISTORY, &state.messages);
        self.persist(keys::INPUT_HISTORY, &state.input_history);

        tracing::debug!(
            message_id = %user.id,
            delay_ms = delay.as_millis() as u64,
            "user message sent, reply scheduled"
        );

        PendingReply {
            user,
            delay,
            content: reply,
        }
    }

    pub fn finish_turn(&self, pending: PendingReply) -> Turn {
        let reply = Message::new_assistant(pending.content.to_string(), &pending.user.id);

        let mut state = self.state();
        state.messages.push(reply.clone());
        state.pending_replies = state.pending_replies.saturating_sub(1);
        self.persist(keys::CHAT_HISTORY, &state.messages);

        tracing::debug!(message_id = %reply.id, reply_to = %pending.user.id, "assistant replied");

        Turn {
            user: pending.user,
            reply,
        }
    }

    /// Empties the log. The input history is kept.
    pub fn clear(&self) {
        let mut state = self.state();
        state.messages.clear();
        self.persist(keys::CHAT_HISTORY, &state.messages);
        tracing::info!("conversation cleared");
    }

    /// Renders the log in `format`. Returns `None` when there is nothing to
    /// export.
    pub fn export(&self, format: ExportFormat) -> Result<Option<ExportArtifact>, ChatError> {
        let state = self.state();
        if state.messages.is_empty() {
            return Ok(None);
        }

        let content = match format {
            ExportFormat::Json => serde_json::to_string_pretty(&state.messages)?,
            ExportFormat::Text => render_transcript(&state.messages),
        };

        Ok(Some(ExportArtifact {
            filename: format!(
                "chat-export-{}.{}",
                export_date(&Utc::now()),
                format.extension()
            ),
            content_type: format.content_type(),
            content,
        }))
    }

    /// Sets the rating of `message_id`, replacing any earlier one. Returns
    /// false when no such message exists.
    pub fn rate(&self, message_id: &str, rating: Rating) -> bool {
        let mut state = self.state();
        let Some(message) = state.messages.iter_mut().find(|m| m.id == message_id) else {
            return false;
        };
        message.rating = Some(rating);
        self.persist(keys::CHAT_HISTORY, &state.messages);
        true
    }

    /// Moves the history cursor and returns the entry under it, or an empty
    /// string once the cursor is back on the draft.
    pub fn navigate_history(&self, direction: HistoryDirection) -> String {
        let mut state = self.state();
        if state.input_history.is_empty() {
            return String::new();
        }

        let last = state.input_history.len() as i32 - 1;
        let index = match direction {
            HistoryDirection::Up => (state.history_index + 1).min(last),
            HistoryDirection::Down => (state.history_index - 1).max(-1),
        };
        state.history_index = index;

        if index >= 0 {
            state.input_history[index as usize].clone()
        } else {
            String::new()
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn input_history(&self) -> Vec<String> {
        self.state().input_history.clone()
    }

    pub fn history_index(&self) -> i32 {
        self.state().history_index
    }

    pub fn is_typing(&self) -> bool {
        self.state().pending_replies > 0
    }

    pub fn status(&self) -> ChatStatus {
        let state = self.state();
        ChatStatus {
            is_typing: state.pending_replies > 0,
            message_count: state.messages.len(),
            input_history: state.input_history.clone(),
            history_index: state.history_index,
        }
    }
}

fn record_input(history: &mut Vec<String>, content: &str) {
    if history.iter().any(|entry| entry == content) {
        return;
    }
    history.insert(0, content.to_string());
    history.truncate(INPUT_HISTORY_LIMIT);
}

fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            format!(
                "[{}] {}: {}",
                format_local_timestamp(&m.timestamp),
                m.sender.as_str().to_uppercase(),
                m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
