//! Sliding-window conversation memory
//!
//! Keeps the last K question/answer exchanges of a session. Older exchanges
//! fall off the front as new ones are recorded.

use crate::provider::{ChatMessage, Role};
use std::collections::VecDeque;

/// One completed question and its answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct WindowMemory {
    window: usize,
    exchanges: VecDeque<Exchange>,
}

impl WindowMemory {
    /// Memory holding at most `window` exchanges (minimum 1)
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            exchanges: VecDeque::with_capacity(window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        if self.exchanges.len() == self.window {
            self.exchanges.pop_front();
        }
        self.exchanges.push_back(Exchange {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    /// History as alternating user/assistant messages, oldest first
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.exchanges
            .iter()
            .flat_map(|e| {
                [
                    ChatMessage::new(Role::User, e.question.clone()),
                    ChatMessage::new(Role::Assistant, e.answer.clone()),
                ]
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }
}
