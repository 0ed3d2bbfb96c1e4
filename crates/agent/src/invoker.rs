//! Model invoker: one prompt in, raw model text out.

use async_trait::async_trait;
use std::sync::Arc;
use todoclaw_core::error::ProviderError;
use todoclaw_core::message::Message;
use todoclaw_core::provider::{Provider, ProviderRequest};
use tracing::debug;

/// Failure to get any text back from the model.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvokerError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("model returned an empty response")]
    EmptyResponse,
}

/// The agent loop's only view of the language model.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn call(&self, prompt: &str) -> Result<String, InvokerError>;
}

/// Sends each prompt to a [`Provider`] as a single user message.
pub struct ProviderInvoker {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ProviderInvoker {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

#[async_trait]
impl ModelInvoker for ProviderInvoker {
    async fn call(&self, prompt: &str) -> Result<String, InvokerError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: vec![],
        };

        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                provider = %self.provider.name(),
                model = %response.model,
                tokens = usage.total_tokens,
                "Model call finished"
            );
        }

        let text = response.message.content;
        if text.trim().is_empty() {
            return Err(InvokerError::EmptyResponse);
        }
        Ok(text)
    }
}
