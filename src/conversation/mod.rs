//! Conversation engine
//!
//! A [`ConversationSession`] is one logical chat with a model: it keeps a
//! window of recent exchanges, streams answers token by token and lets the
//! caller abort an answer mid-stream.
//!
//! # State machine
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──probe ok──▶ Connected
//!       ▲                         │                      │  Idle ⇄ QuestionInFlight
//!       └────── any model error ──┴──────────────────────┘
//! ```
//!
//! A question in flight ends either completed or aborted; both return the
//! session to idle. Asking while another question is in flight is rejected
//! with [`QuestionOutcome::Rejected`], never queued.

pub mod cancel;
mod errors;
pub mod memory;
pub mod prompt;
mod registry;
mod session;

pub use cancel::{CancellationToken, QuestionState, TokenDecision};
pub use errors::{translate_error, ConversationError, INVALID_API_KEY_MESSAGE};
pub use memory::WindowMemory;
pub use registry::SessionRegistry;
pub use session::ConversationSession;

use crate::config::ChatConfig;

/// Connection lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Result of [`ConversationSession::ask_question`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionOutcome {
    /// The full answer
    Answered(String),
    /// Cancelled mid-stream; holds the text delivered before the abort
    Aborted(String),
    /// Another question was already in flight
    Rejected,
}

impl QuestionOutcome {
    /// Answer text, `None` when the question was rejected
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Answered(text) | Self::Aborted(text) => Some(text),
            Self::Rejected => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

/// Model parameters shared by every session of a registry
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub model: String,
    pub history_window: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub cost_notice_threshold: f64,
}

impl From<&ChatConfig> for SessionSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            model: config.model.clone(),
            history_window: config.history_window,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            cost_notice_threshold: config.cost_notice_threshold,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}
