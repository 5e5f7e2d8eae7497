use std::sync::Arc;

use common::storage::types::message::ChatMessage;
use tracing::warn;

use crate::{generator::TextGenerator, prompt::OPENING_PROMPT};

/// An in-memory conversation about one document.
///
/// Generation failures never escape: they become an assistant turn flagged
/// as an error, and the session stays usable.
pub struct ChatSession {
    generator: Arc<dyn TextGenerator>,
    document_text: String,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        document_text: String,
        history: Vec<ChatMessage>,
    ) -> Self {
        Self {
            generator,
            document_text,
            messages: history,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    /// Opens the conversation with a summary when there is no history yet.
    /// Returns the turns added.
    pub async fn start(&mut self) -> Vec<ChatMessage> {
        if !self.messages.is_empty() {
            return Vec::new();
        }

        let reply = self.reply(OPENING_PROMPT, 0).await;
        self.messages.push(reply.clone());
        vec![reply]
    }

    /// Answers one user turn using the history that precedes it.
    /// Blank input is ignored. Returns the turns added.
    pub async fn send(&mut self, input: &str) -> Vec<ChatMessage> {
        if input.trim().is_empty() {
            return Vec::new();
        }

        let preceding = self.messages.len();
        let user_turn = ChatMessage::user(input);
        self.messages.push(user_turn.clone());

        let reply = self.reply(input, preceding).await;
        self.messages.push(reply.clone());
        vec![user_turn, reply]
    }

    async fn reply(&self, prompt: &str, history_len: usize) -> ChatMessage {
        let history = &self.messages[..history_len];
        match self
            .generator
            .ask(prompt, history, &self.document_text)
            .await
        {
            Ok(content) => ChatMessage::assistant(content),
            Err(err) => {
                warn!(error = %err, "Generation failed; answering with an error turn");
                ChatMessage::assistant_error()
            }
        }
    }
}

/// Scripted generators for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use common::{error::AppError, storage::types::message::ChatMessage};

    use crate::generator::TextGenerator;

    /// What the generator was asked, per call.
    #[derive(Debug, Clone)]
    pub struct Call {
        pub prompt: String,
        pub history: Vec<ChatMessage>,
        pub document_text: String,
    }

    /// Replies `re: <prompt>`, or fails when the prompt contains "fail".
    #[derive(Default)]
    pub struct EchoGenerator {
        pub calls: Mutex<Vec<Call>>,
    }

    impl EchoGenerator {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn ask(
            &self,
            prompt: &str,
            history: &[ChatMessage],
            document_text: &str,
        ) -> Result<String, AppError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(Call {
                    prompt: prompt.to_string(),
                    history: history.to_vec(),
                    document_text: document_text.to_string(),
                });
            }
            if prompt.contains("fail") {
                return Err(AppError::Generation("upstream unavailable".into()));
            }
            Ok(format!("re: {prompt}"))
        }
    }
}
