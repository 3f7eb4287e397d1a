//! Streaming client for the AI completion endpoint.
//!
//! The endpoint speaks the Ollama generate protocol: one POST with
//! `stream: true`, answered by newline-delimited JSON objects that each
//! optionally carry a `response` text fragment. The client exposes the
//! reply as a cancellable async stream of fragments with an explicit
//! terminal state, so consumers never deal with the wire format.

use std::pin::Pin;
use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use futures::StreamExt;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Prompt wrapper applied to every outgoing inquiry.
const ANALYST_PREAMBLE: &str = "You are an expert financial analyst for FinSight. \
     Provide a clear and detailed analysis for the following inquiry: ";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}")]
    Status { status: reqwest::StatusCode },
}

/// How a completion stream ended.
#[derive(Debug)]
pub enum StreamEnd {
    Completed,
    Failed(AssistantError),
    Cancelled,
}

/// One item of a completion stream: zero or more fragments followed by
/// exactly one terminal marker.
#[derive(Debug)]
pub enum CompletionItem {
    Fragment(String),
    End(StreamEnd),
}

pub type CompletionStream = Pin<Box<dyn Stream<Item = CompletionItem> + Send>>;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
}

#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    url: String,
    model: String,
}

impl CompletionClient {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
            model: model.into(),
        })
    }

    /// Start a completion for `inquiry`. The returned stream yields text
    /// fragments as they arrive and always terminates with a single
    /// [`CompletionItem::End`]; transport failures surface there rather
    /// than as an `Err` so callers have one consumption path.
    pub fn stream(&self, inquiry: &str, cancel: CancellationToken) -> CompletionStream {
        let request = self
            .http
            .post(&self.url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt: format!("{ANALYST_PREAMBLE}{inquiry}"),
                stream: true,
            })
            .send();

        Box::pin(stream! {
            let resp = match request.await {
                Ok(resp) if resp.status().is_success() => resp,
                Ok(resp) => {
                    yield CompletionItem::End(StreamEnd::Failed(AssistantError::Status {
                        status: resp.status(),
                    }));
                    return;
                }
                Err(err) => {
                    yield CompletionItem::End(StreamEnd::Failed(err.into()));
                    return;
                }
            };

            let mut body = resp.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        yield CompletionItem::End(StreamEnd::Cancelled);
                        return;
                    }
                    next = body.next() => match next {
                        Some(Ok(bytes)) => {
                            buffer.extend_from_slice(&bytes);
                            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                                let line: Vec<u8> = buffer.drain(..=pos).collect();
                                match parse_line(&line) {
                                    Some(chunk) => {
                                        if let Some(fragment) = chunk.response {
                                            yield CompletionItem::Fragment(fragment);
                                        }
                                        if chunk.done {
                                            yield CompletionItem::End(StreamEnd::Completed);
                                            return;
                                        }
                                    }
                                    None => continue,
                                }
                            }
                        }
                        Some(Err(err)) => {
                            yield CompletionItem::End(StreamEnd::Failed(err.into()));
                            return;
                        }
                        None => break,
                    }
                }
            }

            // Trailing data without a final newline still counts.
            if let Some(chunk) = parse_line(&buffer)
                && let Some(fragment) = chunk.response
            {
                yield CompletionItem::Fragment(fragment);
            }
            yield CompletionItem::End(StreamEnd::Completed);
        })
    }
}

/// Parse one NDJSON line; malformed lines are skipped, never fatal.
fn parse_line(raw: &[u8]) -> Option<GenerateChunk> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(chunk) => Some(chunk),
        Err(err) => {
            debug!("skipping malformed completion chunk: {err}");
            None
        }
    }
}
