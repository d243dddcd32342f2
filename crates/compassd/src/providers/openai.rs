//! OpenAI chat-completions driver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use compass_common::{ChatMessage, GuidanceRequest, ProviderCallResult, ProviderErrorKind};

use crate::config::OpenAiConfig;
use crate::prompts;
use crate::providers::{classify_status, classify_transport, ProviderAdapter, DRIVER_HTTP_TIMEOUT};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiDriver {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiDriver {
    pub fn new(config: &OpenAiConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            warn!("[P]  openai: {} not set, attempts will fail auth", config.api_key_env);
        }
        Self {
            http_client: reqwest::Client::builder()
                .timeout(DRIVER_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiDriver {
    fn id(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &GuidanceRequest) -> ProviderCallResult {
        let started = Instant::now();
        let elapsed_ms = |s: Instant| s.elapsed().as_millis() as u64;

        let Some(api_key) = &self.api_key else {
            return ProviderCallResult::failure(self.id(), ProviderErrorKind::AuthFailure, 0);
        };

        let messages = prompts::build_messages(request);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &messages,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!("[>]  openai call [{}]", self.model);

        let response = match self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let kind = classify_transport(&e);
                warn!("[-]  openai transport error: {}", e);
                return ProviderCallResult::failure(self.id(), kind, elapsed_ms(started));
            }
        };

        if !response.status().is_success() {
            let kind = classify_status(response.status());
            warn!("[-]  openai returned {}", response.status());
            return ProviderCallResult::failure(self.id(), kind, elapsed_ms(started));
        }

        let parsed: ChatCompletionResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("[-]  openai response unparsable: {}", e);
                return ProviderCallResult::failure(
                    self.id(),
                    ProviderErrorKind::MalformedResponse,
                    elapsed_ms(started),
                );
            }
        };

        match parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
        {
            Some(text) => ProviderCallResult::success(self.id(), text, elapsed_ms(started)),
            None => ProviderCallResult::failure(
                self.id(),
                ProviderErrorKind::MalformedResponse,
                elapsed_ms(started),
            ),
        }
    }
}
