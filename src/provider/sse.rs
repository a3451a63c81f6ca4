// SSE (Server-Sent Events) decoding for streaming chat responses
//
// Both vendors stream answers as SSE. Each event is a group of lines:
// ```
// event: <event_type>
// data: <json_payload>
// ```
//
// Decoding happens in two steps:
//
// 1. **Line framing** (`SseDecoder`): network chunks are buffered as raw bytes
//    and split on `\n`, so a chunk boundary may fall anywhere, including inside
//    a multi-byte UTF-8 sequence. Only `data:` payloads are kept.
//
// 2. **Dialect parsing** (`parse_openai_data`, `parse_anthropic_data`): each
//    payload is classified as a text fragment, end of stream, an in-band error,
//    or something to skip (role headers, usage, pings).

use super::{ProviderError, TokenStream};
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use std::collections::VecDeque;

// ============================================================================
// Line Framing
// ============================================================================

/// Incremental splitter for `data:` lines
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a network chunk, returning every `data:` payload it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = data_payload(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flush a trailing line the server did not terminate
    pub fn finish(&mut self) -> Vec<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line).into_iter().collect()
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data).to_string())
}

// ============================================================================
// Dialects
// ============================================================================

/// Meaning of one `data:` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Incremental answer text
    Token(String),
    /// The server finished the answer
    Done,
    /// The server reported an error inside the stream
    Error(String),
    /// Metadata the caller does not need
    Skip,
}

/// Parse an OpenAI chat-completions chunk
///
/// Text lives in `choices[0].delta.content`; the stream ends with `[DONE]`.
pub fn parse_openai_data(data: &str) -> SseEvent {
    let data = data.trim();
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    let Ok(json) = serde_json::from_str::<serde_json::Value>(data) else {
        return SseEvent::Skip;
    };

    if let Some(error) = json.get("error") {
        return SseEvent::Error(error_text(error));
    }

    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(|t| SseEvent::Token(t.to_string()))
        .unwrap_or(SseEvent::Skip)
}

/// Parse an Anthropic messages event
///
/// Key event types:
/// - `content_block_delta` with a `text_delta`: incremental text
/// - `message_stop`: stream complete
/// - `error`: overloaded or failed mid-stream
pub fn parse_anthropic_data(data: &str) -> SseEvent {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(data.trim()) else {
        return SseEvent::Skip;
    };

    match json.get("type").and_then(|v| v.as_str()) {
        Some("content_block_delta") => {
            let Some(delta) = json.get("delta") else {
                return SseEvent::Skip;
            };
            if delta.get("type").and_then(|v| v.as_str()) != Some("text_delta") {
                return SseEvent::Skip;
            }
            delta
                .get("text")
                .and_then(|v| v.as_str())
                .filter(|t| !t.is_empty())
                .map(|t| SseEvent::Token(t.to_string()))
                .unwrap_or(SseEvent::Skip)
        }
        Some("message_stop") => SseEvent::Done,
        Some("error") => SseEvent::Error(
            json.get("error")
                .map(error_text)
                .unwrap_or_else(|| "unknown stream error".to_string()),
        ),
        _ => SseEvent::Skip,
    }
}

fn error_text(error: &serde_json::Value) -> String {
    let message = error
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown stream error");
    match error.get("type").and_then(|v| v.as_str()) {
        Some(kind) => format!("{} ({})", message, kind),
        None => message.to_string(),
    }
}

// ============================================================================
// Token Stream
// ============================================================================

struct StreamState {
    body: BoxStream<'static, Result<Bytes, ProviderError>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    parse: fn(&str) -> SseEvent,
    finished: bool,
}

/// Turn a streaming HTTP response into a token stream
pub fn token_stream(response: reqwest::Response, parse: fn(&str) -> SseEvent) -> TokenStream {
    decode_stream(
        response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ProviderError::from)),
        parse,
    )
}

/// Decode any byte stream of SSE into text fragments
///
/// The stream ends after the dialect's end marker, after the first error, or
/// when the body ends.
pub fn decode_stream<S>(body: S, parse: fn(&str) -> SseEvent) -> TokenStream
where
    S: Stream<Item = Result<Bytes, ProviderError>> + Send + 'static,
{
    let state = StreamState {
        body: body.boxed(),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        parse,
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(data) = state.pending.pop_front() {
                match (state.parse)(&data) {
                    SseEvent::Token(text) => return Some((Ok(text), state)),
                    SseEvent::Skip => continue,
                    SseEvent::Done => return None,
                    SseEvent::Error(message) => {
                        state.finished = true;
                        state.pending.clear();
                        return Some((Err(ProviderError::Stream(message)), state));
                    }
                }
            }

            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let payloads = state.decoder.push(&chunk);
                    state.pending.extend(payloads);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.finished = true;
                    let payloads = state.decoder.finish();
                    state.pending.extend(payloads);
                }
            }
        }
    })
    .boxed()
}
