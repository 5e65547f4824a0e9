use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::config::AssistantConfig;
use crate::core::{AppError, AppErrorType};

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("request to the assistant failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("assistant responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("assistant returned no choices")]
    EmptyReply,
}

impl From<AssistantError> for AppError {
    fn from(error: AssistantError) -> Self {
        AppError {
            cause: Some(error.to_string()),
            error_type: AppErrorType::UpstreamError,
            message: Some("The AI assistant is unavailable right now. Please try again later.".to_string()),
        }
    }
}

/// One earlier prompt/response pair sent back as context.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub prompt: String,
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct AssistantClient {
    client: Client,
    base_url: String,
    api_key: Secret<String>,
    model: String,
    system_prompt: String,
    history_turns: usize,
}

impl AssistantClient {
    pub fn new(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            history_turns: config.history_turns,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history_turns(&self) -> usize {
        self.history_turns
    }

    fn conversation(&self, history: &[ChatTurn], prompt: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::new("system", &self.system_prompt)];
        let skip = history.len().saturating_sub(self.history_turns);
        for turn in history.iter().skip(skip) {
            messages.push(ChatMessage::new("user", &turn.prompt));
            messages.push(ChatMessage::new("assistant", &turn.response));
        }
        messages.push(ChatMessage::new("user", prompt));
        messages
    }

    /// `history` is oldest first; only the most recent turns are sent.
    #[tracing::instrument(name = "Ask assistant", skip(self, history, prompt))]
    pub async fn reply(&self, history: &[ChatTurn], prompt: &str) -> Result<String, AssistantError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = CompletionRequest {
            model: &self.model,
            messages: self.conversation(history, prompt),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Status { status, body });
        }

        let completion = response.json::<CompletionResponse>().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(AssistantError::EmptyReply)
    }
}
