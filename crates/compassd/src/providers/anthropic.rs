//! Anthropic messages driver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use compass_common::{GuidanceRequest, ProviderCallResult, ProviderErrorKind};

use crate::config::AnthropicConfig;
use crate::prompts;
use crate::providers::{classify_status, classify_transport, ProviderAdapter, DRIVER_HTTP_TIMEOUT};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    block_type: String,
    #[serde(default)]
    text: String,
}

pub struct AnthropicDriver {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl AnthropicDriver {
    pub fn new(config: &AnthropicConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            warn!("[P]  anthropic: {} not set, attempts will fail auth", config.api_key_env);
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
impl ProviderAdapter for AnthropicDriver {
    fn id(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &GuidanceRequest) -> ProviderCallResult {
        let started = Instant::now();
        let elapsed_ms = |s: Instant| s.elapsed().as_millis() as u64;

        let Some(api_key) = &self.api_key else {
            return ProviderCallResult::failure(self.id(), ProviderErrorKind::AuthFailure, 0);
        };

        // Anthropic takes the system prompt out of band; user turns only
        let messages = prompts::build_messages(request);
        let system = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let wire_messages: Vec<WireMessage> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: m.content.as_str(),
            })
            .collect();

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            system,
            messages: wire_messages,
        };

        let url = format!("{}/v1/messages", self.base_url);
        debug!("[>]  anthropic call [{}]", self.model);

        let response = match self
            .http_client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let kind = classify_transport(&e);
                warn!("[-]  anthropic transport error: {}", e);
                return ProviderCallResult::failure(self.id(), kind, elapsed_ms(started));
            }
        };

        if !response.status().is_success() {
            let kind = classify_status(response.status());
            warn!("[-]  anthropic returned {}", response.status());
            return ProviderCallResult::failure(self.id(), kind, elapsed_ms(started));
        }

        let parsed: MessagesResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("[-]  anthropic response unparsable: {}", e);
                return ProviderCallResult::failure(
                    self.id(),
                    ProviderErrorKind::MalformedResponse,
                    elapsed_ms(started),
                );
            }
        };

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            ProviderCallResult::failure(
                self.id(),
                ProviderErrorKind::MalformedResponse,
                elapsed_ms(started),
            )
        } else {
            ProviderCallResult::success(self.id(), text, elapsed_ms(started))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let json = r#"{"content":[{"type":"text","text":"part one "},{"type":"text","text":"part two"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(json).unwrap();
        let text: String = parsed
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text.as_str())
            .collect();
        assert_eq!(text, "part one part two");
    }

    #[test]
    fn test_non_text_blocks_ignored() {
        let json = r#"{"content":[{"type":"tool_use"},{"type":"text","text":"kept"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(json).unwrap();
        let text: String = parsed
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text.as_str())
            .collect();
        assert_eq!(text, "kept");
    }
}
