use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use common::{
    error::AppError, storage::types::message::ChatMessage, utils::config::AppConfig,
};
use tracing::{debug, warn};

use crate::prompt::build_prompt;

/// The text-generation boundary: one reply per prompt.
///
/// Every failure, whatever its cause, surfaces as `AppError::Generation`.
/// Nothing is retried.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn ask(
        &self,
        prompt: &str,
        history: &[ChatMessage],
        document_text: &str,
    ) -> Result<String, AppError>;
}

/// Generator backed by any OpenAI-compatible chat completions endpoint.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(client: Client<OpenAIConfig>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(&config.openai_api_key)
                .with_api_base(&config.openai_base_url),
        );
        Self::new(client, config.chat_model.clone())
    }
}

fn generation_error(err: impl std::fmt::Display) -> AppError {
    AppError::Generation(err.to_string())
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn ask(
        &self,
        prompt: &str,
        history: &[ChatMessage],
        document_text: &str,
    ) -> Result<String, AppError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([ChatCompletionRequestUserMessage::from(build_prompt(
                prompt,
                history,
                document_text,
            ))
            .into()])
            .build()
            .map_err(generation_error)?;

        let response = self.client.chat().create(request).await.map_err(|err| {
            warn!(model = %self.model, error = %err, "Chat completion request failed");
            generation_error(err)
        })?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::Generation("Model returned no content".into()))?;

        debug!(model = %self.model, chars = reply.len(), "Received reply");
        Ok(reply)
    }
}
