//! Uniform provider call contract shared by all vendor drivers.

use serde::{Deserialize, Serialize};

/// Shared classification of provider failures. Every driver maps its own
/// wire-level errors into this enum; no caller sees vendor error shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    RateLimited,
    AuthFailure,
    Timeout,
    MalformedResponse,
    Network,
    Unavailable,
}

impl ProviderErrorKind {
    /// Transient failures are expected to clear on their own; persistent
    /// ones (bad credentials, broken response contract) count harder
    /// against a provider's circuit breaker.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimited
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::Network
                | ProviderErrorKind::Unavailable
        )
    }
}

/// Outcome of a single provider attempt. Ephemeral, produced once per
/// attempt; the guarded client decides what happens next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCallResult {
    pub provider_id: String,
    pub text: String,
    pub latency_ms: u64,
    pub succeeded: bool,
    pub error_kind: Option<ProviderErrorKind>,
}

impl ProviderCallResult {
    pub fn success(provider_id: impl Into<String>, text: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            provider_id: provider_id.into(),
            text: text.into(),
            latency_ms,
            succeeded: true,
            error_kind: None,
        }
    }

    pub fn failure(provider_id: impl Into<String>, kind: ProviderErrorKind, latency_ms: u64) -> Self {
        Self {
            provider_id: provider_id.into(),
            text: String::new(),
            latency_ms,
            succeeded: false,
            error_kind: Some(kind),
        }
    }
}

/// Neutral chat message; drivers translate to their vendor wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Provider-agnostic generation parameters. Part of the request
/// fingerprint, so two requests differing only here are cached apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 700,
            temperature: 0.2,
        }
    }
}
