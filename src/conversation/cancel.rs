// Cooperative cancellation for in-flight questions
//
// A question is cancelled by flipping a shared flag; the streaming loop checks
// it once per token. The first check that sees the flag wins a single
// compare-and-set on `acknowledged`, which is what guarantees the abort
// callback runs at most once even if several places observe the cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, single-use cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Calling it again has no further effect.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What the streaming loop does with the token it just received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenDecision {
    /// Deliver the token to the caller
    Forward,
    /// Cancellation was just observed; run the abort path once
    Abort,
    /// Cancellation was already handled; discard
    Drop,
}

/// Bookkeeping for the one question a session may have in flight
#[derive(Debug, Default)]
pub struct QuestionState {
    token: CancellationToken,
    acknowledged: AtomicBool,
}

impl QuestionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::SeqCst)
    }

    /// Mark the cancellation as handled
    ///
    /// Returns `true` only for the call that performed the transition.
    pub(crate) fn acknowledge(&self) -> bool {
        self.acknowledged
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Per-token check
    pub fn observe(&self) -> TokenDecision {
        if self.is_acknowledged() {
            TokenDecision::Drop
        } else if self.is_cancelled() && self.acknowledge() {
            TokenDecision::Abort
        } else if self.is_cancelled() {
            // Lost the acknowledge race to another observer
            TokenDecision::Drop
        } else {
            TokenDecision::Forward
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_clones_share_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_forward_until_cancelled() {
        let state = QuestionState::new();
        assert_eq!(state.observe(), TokenDecision::Forward);
        assert_eq!(state.observe(), TokenDecision::Forward);
        assert!(!state.is_acknowledged());
    }

    #[test]
    fn test_abort_is_observed_once() {
        let state = QuestionState::new();
        state.cancel();
        let decisions: Vec<_> = (0..4).map(|_| state.observe()).collect();
        assert_eq!(
            decisions,
            vec![
                TokenDecision::Abort,
                TokenDecision::Drop,
                TokenDecision::Drop,
                TokenDecision::Drop
            ]
        );
        assert!(state.is_acknowledged());
    }

    #[test]
    fn test_acknowledge_transitions_once() {
        let state = QuestionState::new();
        assert!(state.acknowledge());
        assert!(!state.acknowledge());
    }
}
