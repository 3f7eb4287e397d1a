//! Chat session state machine.
//!
//! Each exchange appends the user message, seeds an empty assistant
//! message, and grows that message in place as fragments stream in. A
//! failed stream keeps whatever partial content already arrived and drops
//! the session back to idle; nothing is appended to the transcript about
//! the failure.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use finsight_assistant::CompletionClient;
use finsight_assistant::CompletionItem;
use finsight_assistant::CompletionStream;
use finsight_assistant::StreamEnd;
use finsight_protocol::ChatMessage;

/// Opening assistant message seeded into every new session.
const GREETING: &str = "Hello! I'm your FinSight AI assistant. I can help you \
     analyze P&L data, understand trends, and answer questions about your \
     financial performance. What would you like to know?";

/// Suggested prompts shown while the transcript is still fresh.
pub const QUICK_QUESTIONS: [&str; 3] = [
    "What's the overall margin trend?",
    "Which accounts need attention?",
    "Show top performing projects",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    Sending,
    Streaming,
}

/// Transport seam so sessions can run against a fake in tests.
pub trait CompletionTransport: Send + Sync {
    fn stream(&self, inquiry: &str, cancel: CancellationToken) -> CompletionStream;
}

impl CompletionTransport for CompletionClient {
    fn stream(&self, inquiry: &str, cancel: CancellationToken) -> CompletionStream {
        CompletionClient::stream(self, inquiry, cancel)
    }
}

pub struct ChatSession {
    transport: Arc<dyn CompletionTransport>,
    messages: Vec<ChatMessage>,
    phase: ChatPhase,
    cancel: Option<CancellationToken>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn CompletionTransport>) -> Self {
        Self {
            transport,
            messages: vec![ChatMessage::assistant(GREETING)],
            phase: ChatPhase::Idle,
            cancel: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    /// Quick questions stay visible until the user has asked something.
    pub fn show_quick_questions(&self) -> bool {
        self.messages.len() <= 2
    }

    /// Send a user message and stream the reply to completion. Blank input
    /// and re-entrant sends are ignored, mirroring a disabled send button.
    pub async fn send(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() || self.phase != ChatPhase::Idle {
            return;
        }

        self.phase = ChatPhase::Sending;
        self.messages.push(ChatMessage::user(text));

        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());
        let stream = self.transport.stream(text, cancel);

        self.messages.push(ChatMessage::assistant(""));
        self.phase = ChatPhase::Streaming;

        self.consume(stream).await;
        self.cancel = None;
        self.phase = ChatPhase::Idle;
    }

    /// Programmatic user input, equivalent to typing into the panel. Used
    /// by the Ask-Nova path; the caller is responsible for any panel
    /// mount delay.
    pub async fn inject(&mut self, text: &str) {
        self.send(text).await;
    }

    /// Abort the in-flight stream, keeping whatever already arrived.
    pub fn cancel_streaming(&self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    async fn consume(&mut self, mut stream: CompletionStream) {
        while let Some(item) = stream.next().await {
            match item {
                CompletionItem::Fragment(fragment) => {
                    if let Some(last) = self.messages.last_mut() {
                        last.content.push_str(&fragment);
                    }
                }
                CompletionItem::End(StreamEnd::Completed) => return,
                CompletionItem::End(StreamEnd::Cancelled) => return,
                CompletionItem::End(StreamEnd::Failed(err)) => {
                    warn!("completion stream failed: {err}");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsight_assistant::AssistantError;
    use finsight_protocol::ChatRole;
    use pretty_assertions::assert_eq;

    /// Transport replaying a scripted item sequence.
    struct ScriptedTransport {
        script: Vec<Vec<ScriptItem>>,
        cursor: std::sync::Mutex<usize>,
    }

    #[derive(Clone)]
    enum ScriptItem {
        Fragment(&'static str),
        Completed,
        Failed,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Vec<ScriptItem>>) -> Arc<Self> {
            Arc::new(Self {
                script,
                cursor: std::sync::Mutex::new(0),
            })
        }
    }

    impl CompletionTransport for ScriptedTransport {
        fn stream(&self, _inquiry: &str, _cancel: CancellationToken) -> CompletionStream {
            let mut cursor = self.cursor.lock().expect("cursor");
            let items = self.script.get(*cursor).cloned().unwrap_or_default();
            *cursor += 1;
            let items: Vec<CompletionItem> = items
                .into_iter()
                .map(|item| match item {
                    ScriptItem::Fragment(text) => CompletionItem::Fragment(text.to_string()),
                    ScriptItem::Completed => CompletionItem::End(StreamEnd::Completed),
                    ScriptItem::Failed => CompletionItem::End(StreamEnd::Failed(
                        AssistantError::Status {
                            status: reqwest::StatusCode::BAD_GATEWAY,
                        },
                    )),
                })
                .collect();
            Box::pin(futures::stream::iter(items))
        }
    }

    #[tokio::test]
    async fn fragments_append_to_one_assistant_message() {
        let transport = ScriptedTransport::new(vec![vec![
            ScriptItem::Fragment("Hel"),
            ScriptItem::Fragment("lo"),
            ScriptItem::Fragment(" world"),
            ScriptItem::Completed,
        ]]);
        let mut session = ChatSession::new(transport);
        session.send("hi there").await;

        // Greeting, user message, streamed reply.
        assert_eq!(session.messages().len(), 3);
        let reply = &session.messages()[2];
        assert_eq!(reply.role, ChatRole::Assistant);
        assert_eq!(reply.content, "Hello world");
        assert_eq!(session.phase(), ChatPhase::Idle);
    }

    #[tokio::test]
    async fn failure_keeps_partial_content_without_a_transcript_note() {
        let transport = ScriptedTransport::new(vec![vec![
            ScriptItem::Fragment("partial"),
            ScriptItem::Failed,
        ]]);
        let mut session = ChatSession::new(transport);
        session.send("question").await;

        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[2].content, "partial");
        assert_eq!(session.phase(), ChatPhase::Idle);
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let transport = ScriptedTransport::new(vec![]);
        let mut session = ChatSession::new(transport);
        session.send("   ").await;
        assert_eq!(session.messages().len(), 1);
        assert!(session.show_quick_questions());
    }

    #[tokio::test]
    async fn quick_questions_disappear_after_the_first_exchange() {
        let transport = ScriptedTransport::new(vec![vec![
            ScriptItem::Fragment("answer"),
            ScriptItem::Completed,
        ]]);
        let mut session = ChatSession::new(transport);
        assert!(session.show_quick_questions());
        session.send(QUICK_QUESTIONS[0]).await;
        assert!(!session.show_quick_questions());
    }
}
