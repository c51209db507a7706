//! Chat-completions text generator.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use cinesift_core::resilience::RetryPolicy;

use crate::error::{EtlError, EtlResult};

const SOURCE_NAME: &str = "LLM";

/// A service that turns a prompt into free-form text.
#[async_trait]
pub trait TextGenerator: Send + Sync + fmt::Debug {
    async fn generate(&self, prompt: &str) -> EtlResult<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    url: String,
    token: String,
    model: String,
    retry: RetryPolicy,
}

impl ChatClient {
    /// Create a new chat client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        model: impl Into<String>,
    ) -> EtlResult<Self> {
        let http = Client::builder()
            .user_agent("cinesift/0.1.0 (https://github.com/cinesift/cinesift)")
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http,
            url: url.into(),
            token: token.into(),
            model: model.into(),
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> EtlResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EtlError::RateLimited {
                source_name: SOURCE_NAME.to_string(),
            });
        }
        if !status.is_success() {
            return Err(EtlError::Http {
                source_name: SOURCE_NAME.to_string(),
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let reply: ChatResponse = response.json().await.map_err(|e| EtlError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: e.to_string(),
        })?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| EtlError::Parse {
                source_name: SOURCE_NAME.to_string(),
                message: "reply has no message content".to_string(),
            })
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn generate(&self, prompt: &str) -> EtlResult<String> {
        self.retry
            .run("chat completion", move || self.complete(prompt))
            .await
    }
}
