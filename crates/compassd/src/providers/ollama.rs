//! Local Ollama driver.
//!
//! Keeps a self-hosted fallback in the order so guidance stays available
//! when hosted vendors are down. No authentication.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use compass_common::{ChatMessage, GuidanceRequest, ProviderCallResult, ProviderErrorKind};

use crate::config::OllamaConfig;
use crate::prompts;
use crate::providers::{classify_status, classify_transport, ProviderAdapter, DRIVER_HTTP_TIMEOUT};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

pub struct OllamaDriver {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaDriver {
    pub fn new(config: &OllamaConfig) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(DRIVER_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for OllamaDriver {
    fn id(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &GuidanceRequest) -> ProviderCallResult {
        let started = Instant::now();
        let elapsed_ms = |s: Instant| s.elapsed().as_millis() as u64;

        let messages = prompts::build_messages(request);
        let body = OllamaChatRequest {
            model: &self.model,
            messages: &messages,
            stream: false,
            options: OllamaOptions {
                num_predict: request.params.max_tokens,
                temperature: request.params.temperature,
            },
        };

        let url = format!("{}/api/chat", self.base_url);
        debug!("[>]  ollama call [{}]", self.model);

        let response = match self.http_client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                let kind = classify_transport(&e);
                warn!("[-]  ollama transport error: {}", e);
                return ProviderCallResult::failure(self.id(), kind, elapsed_ms(started));
            }
        };

        if !response.status().is_success() {
            let kind = classify_status(response.status());
            warn!("[-]  ollama returned {}", response.status());
            return ProviderCallResult::failure(self.id(), kind, elapsed_ms(started));
        }

        let parsed: OllamaChatResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("[-]  ollama response unparsable: {}", e);
                return ProviderCallResult::failure(
                    self.id(),
                    ProviderErrorKind::MalformedResponse,
                    elapsed_ms(started),
                );
            }
        };

        if parsed.message.content.trim().is_empty() {
            ProviderCallResult::failure(
                self.id(),
                ProviderErrorKind::MalformedResponse,
                elapsed_ms(started),
            )
        } else {
            ProviderCallResult::success(self.id(), parsed.message.content, elapsed_ms(started))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let json = r#"{"message":{"role":"assistant","content":"guidance"}}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.message.content, "guidance");
    }

    #[test]
    fn test_request_serialisation() {
        let messages = vec![ChatMessage::user("hello")];
        let body = OllamaChatRequest {
            model: "qwen2.5:7b-instruct",
            messages: &messages,
            stream: false,
            options: OllamaOptions {
                num_predict: 700,
                temperature: 0.2,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"stream\":false"));
        assert!(json.contains("\"num_predict\":700"));
    }
}
