// In-process fakes shared by unit tests

use crate::host::Notifier;
use crate::provider::{ChatRequest, ModelProvider, ProviderError, TokenStream};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

enum Script {
    Items(Vec<Result<String, ProviderError>>),
    Channel(mpsc::UnboundedReceiver<Result<String, ProviderError>>),
}

/// Provider that replays queued answers
///
/// Each `stream_chat` call takes the next queued script. Embeddings are
/// letter-frequency vectors, so texts with the same letters are identical
/// neighbours.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    probe_errors: Mutex<VecDeque<ProviderError>>,
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
    probes: AtomicUsize,
    embeds: AtomicUsize,
    slow_completions: AtomicBool,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_probe(&self, err: ProviderError) {
        self.probe_errors.lock().unwrap().push_back(err);
    }

    pub(crate) fn push_answer<const N: usize>(&self, tokens: [&str; N]) {
        self.push_script(tokens.iter().map(|t| Ok(t.to_string())).collect());
    }

    pub(crate) fn push_script(&self, items: Vec<Result<String, ProviderError>>) {
        self.scripts.lock().unwrap().push_back(Script::Items(items));
    }

    /// Queue an answer whose tokens are fed by the test
    pub(crate) fn push_channel(&self) -> mpsc::UnboundedSender<Result<String, ProviderError>> {
        let (tx, rx) = mpsc::unbounded();
        self.scripts.lock().unwrap().push_back(Script::Channel(rx));
        tx
    }

    /// Make `complete_chat` give way to other tasks before it answers
    pub(crate) fn slow_completions(&self) {
        self.slow_completions.store(true, Ordering::SeqCst);
    }

    pub(crate) fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub(crate) fn embed_count(&self) -> usize {
        self.embeds.load(Ordering::SeqCst)
    }

    pub(crate) fn chat_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// 26 lowercase letter counts
pub(crate) fn letter_embedding(text: &str) -> Vec<f32> {
    let mut counts = vec![0.0; 26];
    for c in text.chars().filter(char::is_ascii_alphabetic) {
        counts[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
    }
    counts
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete_chat(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.slow_completions.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        match self.probe_errors.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok("ok".to_string()),
        }
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<TokenStream, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Items(items)) => Ok(futures::stream::iter(items).boxed()),
            Some(Script::Channel(rx)) => Ok(rx.boxed()),
            None => Err(ProviderError::Stream("no scripted answer".to_string())),
        }
    }

    async fn embed_text(&self, _model: &str, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embeds.fetch_add(1, Ordering::SeqCst);
        Ok(letter_embedding(text))
    }

    async fn transcribe_audio(
        &self,
        _model: &str,
        _file_name: &str,
        _audio: Vec<u8>,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: "scripted",
            capability: "transcription",
        })
    }

    async fn synthesize_speech(
        &self,
        _model: &str,
        _voice: &str,
        _text: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: "scripted",
            capability: "speech synthesis",
        })
    }
}

/// Notifier that keeps every notice
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notice(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }
}
