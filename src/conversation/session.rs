// One streaming chat session with a model
//
// Shared state sits behind a std Mutex and every lock is released before the
// next await point, so a session can be driven from one task while another
// task (a Ctrl-C handler, a UI event) calls `abort_current_question`.

use super::cancel::{QuestionState, TokenDecision};
use super::errors::{translate_error, ConversationError};
use super::memory::WindowMemory;
use super::prompt::{build_messages, PromptTemplate};
use super::{ConnectionState, QuestionOutcome, SessionSettings};
use crate::host::Notifier;
use crate::pricing::calculate_cost;
use crate::provider::{ChatMessage, ChatRequest, ModelProvider, ProviderError, Role};
use crate::tokens::{estimate_messages_tokens, estimate_tokens};
use crate::util::preview;
use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Text of the connection probe
const PROBE_MESSAGE: &str = "Hi";

struct SessionState {
    connection: ConnectionState,
    system_context: String,
    memory: Option<WindowMemory>,
    active: Option<Arc<QuestionState>>,
}

pub struct ConversationSession {
    name: String,
    provider: Arc<dyn ModelProvider>,
    settings: SessionSettings,
    notifier: Arc<dyn Notifier>,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("name", &self.name)
            .field("provider", &self.provider.name())
            .field("model", &self.settings.model)
            .field("connection", &self.connection_state())
            .finish()
    }
}

impl ConversationSession {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn ModelProvider>,
        settings: SessionSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            settings,
            notifier,
            state: Mutex::new(SessionState {
                connection: ConnectionState::Disconnected,
                system_context: String::new(),
                memory: None,
                active: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.lock().connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn has_active_question(&self) -> bool {
        self.lock().active.is_some()
    }

    pub fn system_context(&self) -> String {
        self.lock().system_context.clone()
    }

    /// Number of exchanges currently remembered
    pub fn history_len(&self) -> usize {
        self.lock().memory.as_ref().map_or(0, WindowMemory::len)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the system context used by later questions
    ///
    /// Exchanges already in memory are kept as they are.
    pub fn set_context(&self, context: impl Into<String>) {
        self.lock().system_context = context.into();
    }

    /// Verify the model is reachable with a one-token probe
    ///
    /// Does nothing when already connected. On failure the session is torn
    /// down, the user is notified and the translated error is returned.
    pub async fn connect(&self) -> Result<(), ConversationError> {
        {
            let mut state = self.lock();
            match state.connection {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => {
                    return Err(ConversationError::AlreadyConnecting(self.name.clone()))
                }
                ConnectionState::Disconnected => {
                    state.connection = ConnectionState::Connecting;
                    state.memory = Some(WindowMemory::new(self.settings.history_window));
                }
            }
        }

        tracing::debug!(
            session = %self.name,
            provider = self.provider.name(),
            model = %self.settings.model,
            "Probing model"
        );
        let probe = ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage::new(Role::User, PROBE_MESSAGE)],
            max_tokens: 1,
            temperature: self.settings.temperature,
        };

        match self.provider.complete_chat(&probe).await {
            Ok(_) => {
                let mut state = self.lock();
                // A disconnect during the probe wins
                if state.connection != ConnectionState::Connecting {
                    tracing::debug!(session = %self.name, "Disconnected while connecting");
                    return Err(ConversationError::Disconnected(self.name.clone()));
                }
                state.connection = ConnectionState::Connected;
                tracing::info!(session = %self.name, model = %self.settings.model, "Session connected");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Drop connection, memory and any question in flight
    pub fn disconnect(&self) {
        let mut state = self.lock();
        Self::teardown(&mut state);
        tracing::info!(session = %self.name, "Session disconnected");
    }

    fn teardown(state: &mut SessionState) {
        state.connection = ConnectionState::Disconnected;
        state.memory = None;
        if let Some(active) = state.active.take() {
            active.cancel();
        }
    }

    /// Session-fatal failure: notify, log, tear down
    fn fail(&self, err: ProviderError) -> ConversationError {
        let message = translate_error(&err);
        tracing::error!(session = %self.name, error = %err, "Model request failed");
        Self::teardown(&mut self.lock());
        self.notifier.notice(&message);
        ConversationError::Model {
            message,
            source: err,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Questions
    // ─────────────────────────────────────────────────────────────────────────

    /// Cancel the question in flight, if any
    ///
    /// Tokens the stream already handed over before the next check may still
    /// be delivered; nothing is delivered after the abort is acknowledged.
    pub fn abort_current_question(&self) -> bool {
        match self.lock().active.as_ref() {
            Some(active) => {
                active.cancel();
                tracing::debug!(session = %self.name, "Abort requested");
                true
            }
            None => false,
        }
    }

    /// Ask one question and stream the answer
    ///
    /// Connects first when needed. `on_token` receives each fragment in order;
    /// `on_aborted` runs once if the question is cancelled mid-stream.
    /// Returns [`QuestionOutcome::Rejected`] without touching the session when
    /// another question is still in flight.
    pub async fn ask_question<T, A>(
        &self,
        question: &str,
        mut on_token: T,
        on_aborted: A,
    ) -> Result<QuestionOutcome, ConversationError>
    where
        T: FnMut(&str),
        A: FnOnce(),
    {
        match self.connection_state() {
            ConnectionState::Connected => {}
            ConnectionState::Connecting => {
                tracing::debug!(session = %self.name, "Question rejected while connecting");
                return Ok(QuestionOutcome::Rejected);
            }
            ConnectionState::Disconnected => self.connect().await?,
        }

        let question_state = Arc::new(QuestionState::new());
        let request = {
            let mut state = self.lock();
            if state.connection != ConnectionState::Connected {
                return Err(ConversationError::Disconnected(self.name.clone()));
            }
            if state.active.as_ref().is_some_and(|a| !a.is_cancelled()) {
                tracing::debug!(session = %self.name, "Question rejected, another is in flight");
                return Ok(QuestionOutcome::Rejected);
            }
            let history = state
                .memory
                .as_ref()
                .map(WindowMemory::messages)
                .unwrap_or_default();
            let messages = build_messages(
                &PromptTemplate::literal(&state.system_context),
                history,
                &PromptTemplate::literal(question),
            )?;
            // Replaces a cancelled question that has not wound down yet
            state.active = Some(Arc::clone(&question_state));
            ChatRequest {
                model: self.settings.model.clone(),
                messages,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            }
        };

        tracing::debug!(
            session = %self.name,
            question = %preview(question, 80),
            messages = request.messages.len(),
            "Asking question"
        );

        let mut stream = match self.provider.stream_chat(&request).await {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(e)),
        };

        let mut answer = String::new();
        let mut on_aborted = Some(on_aborted);
        let mut aborted = false;

        while let Some(item) = stream.next().await {
            let token = match item {
                Ok(token) => token,
                Err(e) => return Err(self.fail(e)),
            };
            match question_state.observe() {
                TokenDecision::Forward => {
                    on_token(&token);
                    answer.push_str(&token);
                }
                // Drop means the cancellation was acknowledged elsewhere
                TokenDecision::Abort | TokenDecision::Drop => {
                    aborted = true;
                    break;
                }
            }
        }

        // Cancelled after the last token arrived
        if !aborted && question_state.observe() != TokenDecision::Forward {
            aborted = true;
        }

        self.clear_active(&question_state);

        if aborted {
            if let Some(on_aborted) = on_aborted.take() {
                on_aborted();
            }
            tracing::debug!(session = %self.name, delivered = answer.len(), "Question aborted");
            return Ok(QuestionOutcome::Aborted(answer));
        }

        if let Some(memory) = self.lock().memory.as_mut() {
            memory.record(question, answer.clone());
        }
        self.report_cost(&request, &answer);
        Ok(QuestionOutcome::Answered(answer))
    }

    /// Empty the active slot if it still holds `question`
    fn clear_active(&self, question: &Arc<QuestionState>) {
        let mut state = self.lock();
        if state
            .active
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, question))
        {
            state.active = None;
        }
    }

    fn report_cost(&self, request: &ChatRequest, answer: &str) {
        let input_tokens = estimate_messages_tokens(&request.messages);
        let output_tokens = estimate_tokens(answer);
        let cost = calculate_cost(&self.settings.model, input_tokens, output_tokens);

        tracing::debug!(
            session = %self.name,
            input_tokens,
            output_tokens,
            cost_usd = cost,
            "Question answered"
        );

        if cost > self.settings.cost_notice_threshold {
            self.notifier.notice(&format!(
                "Estimated cost of this answer: ${:.4} ({} input + {} output tokens)",
                cost, input_tokens, output_tokens
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::INVALID_API_KEY_MESSAGE;
    use crate::testing::{RecordingNotifier, ScriptedProvider};
    use std::cell::{Cell, RefCell};

    fn session_with(
        provider: &Arc<ScriptedProvider>,
        notifier: &Arc<RecordingNotifier>,
        settings: SessionSettings,
    ) -> ConversationSession {
        ConversationSession::new("test", provider.clone(), settings, notifier.clone())
    }

    fn quiet_settings() -> SessionSettings {
        SessionSettings {
            cost_notice_threshold: f64::MAX,
            ..SessionSettings::default()
        }
    }

    #[tokio::test]
    async fn test_auth_failure_on_connect_leaves_session_disconnected() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.fail_probe(ProviderError::Api {
            status: 401,
            message: "Incorrect API key provided".to_string(),
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());

        let err = session.ask_question("ping", |_| {}, || {}).await.unwrap_err();

        assert_eq!(err.to_string(), INVALID_API_KEY_MESSAGE);
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
        assert_eq!(provider.probe_count(), 1);
        assert!(provider.chat_requests().is_empty());
        assert_eq!(notifier.notices(), vec![INVALID_API_KEY_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_ask_connects_then_streams_tokens() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_answer(["Hel", "lo", "!"]);
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());

        let mut tokens = Vec::new();
        let outcome = session
            .ask_question("greet me", |t| tokens.push(t.to_string()), || {})
            .await
            .unwrap();

        assert_eq!(outcome, QuestionOutcome::Answered("Hello!".to_string()));
        assert_eq!(tokens, vec!["Hel", "lo", "!"]);
        assert!(session.is_connected());
        assert!(!session.has_active_question());
        assert_eq!(session.history_len(), 1);
        assert_eq!(provider.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_is_noop_when_connected() {
        let provider = Arc::new(ScriptedProvider::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());

        session.connect().await.unwrap();
        session.connect().await.unwrap();
        assert_eq!(provider.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_requests_while_connecting_are_turned_away() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.slow_completions();
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());

        let (first, (asked, again)) = tokio::join!(session.connect(), async {
            assert_eq!(session.connection_state(), ConnectionState::Connecting);
            let asked = session.ask_question("early", |_| {}, || {}).await;
            (asked, session.connect().await)
        });

        assert_eq!(asked.unwrap(), QuestionOutcome::Rejected);
        assert!(matches!(again, Err(ConversationError::AlreadyConnecting(name)) if name == "test"));
        first.unwrap();
        assert!(session.is_connected());
        assert_eq!(provider.probe_count(), 1);
        assert!(provider.chat_requests().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_while_connecting_stops_question() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.slow_completions();
        provider.push_answer(["never"]);
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());

        let tokens = Cell::new(0);
        let (outcome, ()) = tokio::join!(
            session.ask_question("q", |_| tokens.set(tokens.get() + 1), || {}),
            async { session.disconnect() }
        );

        assert!(matches!(outcome, Err(ConversationError::Disconnected(_))));
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
        assert!(!session.has_active_question());
        assert_eq!(tokens.get(), 0);
        assert_eq!(provider.probe_count(), 1);
        assert!(provider.chat_requests().is_empty());
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_second_question_rejected_while_first_in_flight() {
        let provider = Arc::new(ScriptedProvider::new());
        let sender = provider.push_channel();
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());
        session.connect().await.unwrap();

        let first = session.ask_question("one", |_| {}, || {});
        let second = async {
            tokio::task::yield_now().await;
            let outcome = session.ask_question("two", |_| {}, || {}).await;
            assert!(session.has_active_question());
            sender.unbounded_send(Ok("done".to_string())).unwrap();
            drop(sender);
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(second.unwrap(), QuestionOutcome::Rejected);
        assert_eq!(first.unwrap(), QuestionOutcome::Answered("done".to_string()));
        assert_eq!(provider.chat_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_abort_stops_tokens_and_fires_once() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_answer(["a", "b", "c", "d"]);
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());

        let received = RefCell::new(Vec::new());
        let aborted = Cell::new(0);
        let outcome = session
            .ask_question(
                "count",
                |t| {
                    received.borrow_mut().push(t.to_string());
                    if t == "b" {
                        session.abort_current_question();
                    }
                },
                || aborted.set(aborted.get() + 1),
            )
            .await
            .unwrap();

        assert_eq!(outcome, QuestionOutcome::Aborted("ab".to_string()));
        assert_eq!(received.into_inner(), vec!["a", "b"]);
        assert_eq!(aborted.get(), 1);
        assert!(!session.has_active_question());
        // Aborted exchanges are not remembered
        assert_eq!(session.history_len(), 0);
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_abort_on_last_token_is_not_answered() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_answer(["a"]);
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());

        let aborted = Cell::new(0);
        let outcome = session
            .ask_question(
                "one",
                |t| {
                    if t == "a" {
                        session.abort_current_question();
                    }
                },
                || aborted.set(aborted.get() + 1),
            )
            .await
            .unwrap();

        assert_eq!(outcome, QuestionOutcome::Aborted("a".to_string()));
        assert_eq!(aborted.get(), 1);
        assert_eq!(session.history_len(), 0);
        assert!(!session.has_active_question());
    }

    #[tokio::test]
    async fn test_abort_acknowledged_elsewhere_still_aborts() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_answer(["a", "b", "c", "d"]);
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());

        let received = RefCell::new(Vec::new());
        let aborted = Cell::new(0);
        let outcome = session
            .ask_question(
                "count",
                |t| {
                    received.borrow_mut().push(t.to_string());
                    if t == "b" {
                        let active = session.lock().active.clone().unwrap();
                        active.cancel();
                        assert!(active.acknowledge());
                    }
                },
                || aborted.set(aborted.get() + 1),
            )
            .await
            .unwrap();

        assert_eq!(outcome, QuestionOutcome::Aborted("ab".to_string()));
        assert_eq!(received.into_inner(), vec!["a", "b"]);
        assert_eq!(aborted.get(), 1);
        assert_eq!(session.history_len(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_question_is_replaced() {
        let provider = Arc::new(ScriptedProvider::new());
        let sender = provider.push_channel();
        provider.push_answer(["fresh"]);
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());
        session.connect().await.unwrap();

        let aborted = Cell::new(false);
        let first = session.ask_question("slow", |_| {}, || aborted.set(true));
        let second = async {
            tokio::task::yield_now().await;
            assert!(session.abort_current_question());
            let outcome = session.ask_question("fast", |_| {}, || {}).await;
            sender.unbounded_send(Ok("late".to_string())).unwrap();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(second.unwrap(), QuestionOutcome::Answered("fresh".to_string()));
        assert_eq!(first.unwrap(), QuestionOutcome::Aborted(String::new()));
        assert!(aborted.get());
        assert!(!session.has_active_question());
    }

    #[tokio::test]
    async fn test_abort_without_question_is_noop() {
        let provider = Arc::new(ScriptedProvider::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());
        assert!(!session.abort_current_question());
    }

    #[tokio::test]
    async fn test_history_window_and_escaping() {
        let provider = Arc::new(ScriptedProvider::new());
        for answer in ["a1", "a2", "a3", "a4"] {
            provider.push_answer([answer]);
        }
        let notifier = Arc::new(RecordingNotifier::default());
        let settings = SessionSettings {
            history_window: 2,
            ..quiet_settings()
        };
        let session = session_with(&provider, &notifier, settings);
        session.set_context("Answer about {notes}");

        for q in ["q1", "q2", "q3", "what is {x}?"] {
            session.ask_question(q, |_| {}, || {}).await.unwrap();
        }

        let requests = provider.chat_requests();
        let last = &requests[3].messages;
        let contents: Vec<&str> = last.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["Answer about {notes}", "q2", "a2", "q3", "a3", "what is {x}?"]
        );
        assert_eq!(last[0].role, Role::System);
        assert_eq!(session.history_len(), 2);
    }

    #[tokio::test]
    async fn test_context_change_keeps_history() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_answer(["first"]);
        provider.push_answer(["second"]);
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());

        session.set_context("old context");
        session.ask_question("q1", |_| {}, || {}).await.unwrap();
        session.set_context("new context");
        session.ask_question("q2", |_| {}, || {}).await.unwrap();

        let requests = provider.chat_requests();
        assert_eq!(requests[1].messages[0].content, "new context");
        assert_eq!(requests[1].messages[1].content, "q1");
        assert_eq!(requests[1].messages[2].content, "first");
    }

    #[tokio::test]
    async fn test_stream_error_tears_down_session() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_script(vec![
            Ok("partial".to_string()),
            Err(ProviderError::Stream("overloaded".to_string())),
        ]);
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());

        let err = session.ask_question("q", |_| {}, || {}).await.unwrap_err();

        assert!(matches!(err, ConversationError::Model { .. }));
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
        assert!(!session.has_active_question());
        assert_eq!(session.history_len(), 0);
        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].starts_with("The model request failed"));
    }

    #[tokio::test]
    async fn test_cost_notice_only_above_threshold() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_answer(["a fairly short answer"]);
        provider.push_answer(["another answer"]);
        let notifier = Arc::new(RecordingNotifier::default());

        let cheap = session_with(&provider, &notifier, quiet_settings());
        cheap.ask_question("q", |_| {}, || {}).await.unwrap();
        assert!(notifier.notices().is_empty());

        let settings = SessionSettings {
            cost_notice_threshold: 0.0,
            ..SessionSettings::default()
        };
        let strict = session_with(&provider, &notifier, settings);
        strict.ask_question("q", |_| {}, || {}).await.unwrap();
        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].starts_with("Estimated cost of this answer"));
    }

    #[tokio::test]
    async fn test_disconnect_clears_state() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_answer(["x"]);
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session_with(&provider, &notifier, quiet_settings());
        session.ask_question("q", |_| {}, || {}).await.unwrap();

        session.disconnect();
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
        assert_eq!(session.history_len(), 0);
    }
}
