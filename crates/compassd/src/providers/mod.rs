//! Vendor drivers behind a uniform call contract.
//!
//! Each driver owns its own wire translation and error classification;
//! no caller branches on vendor identity. Drivers never retry — the
//! guarded client decides what happens after a failed attempt.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use compass_common::{GuidanceRequest, ProviderCallResult, ProviderErrorKind};

use crate::config::ProvidersConfig;

pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicDriver;
pub use ollama::OllamaDriver;
pub use openai::OpenAiDriver;

/// Safety ceiling for driver HTTP clients. The real per-attempt budget
/// is enforced by the guarded client; this only prevents a leaked
/// connection from hanging a task forever.
pub(crate) const DRIVER_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Uniform completion contract implemented once per vendor.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable identifier used for ordering, breakers and logs.
    fn id(&self) -> &str;

    /// One completion attempt.
    async fn complete(&self, request: &GuidanceRequest) -> ProviderCallResult;
}

/// Classify reqwest transport failures into the shared error enum.
pub(crate) fn classify_transport(error: &reqwest::Error) -> ProviderErrorKind {
    if error.is_timeout() {
        ProviderErrorKind::Timeout
    } else if error.is_connect() {
        ProviderErrorKind::Network
    } else if error.is_decode() {
        ProviderErrorKind::MalformedResponse
    } else {
        ProviderErrorKind::Network
    }
}

/// Classify HTTP status codes into the shared error enum.
pub(crate) fn classify_status(status: reqwest::StatusCode) -> ProviderErrorKind {
    match status.as_u16() {
        401 | 403 => ProviderErrorKind::AuthFailure,
        429 => ProviderErrorKind::RateLimited,
        500..=599 => ProviderErrorKind::Unavailable,
        _ => ProviderErrorKind::MalformedResponse,
    }
}

/// Instantiate drivers in the configured priority order. Unknown names
/// are skipped with a warning rather than failing startup.
pub fn build_providers(config: &ProvidersConfig) -> Vec<Arc<dyn ProviderAdapter>> {
    let mut providers: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

    for name in &config.order {
        match name.as_str() {
            "openai" => providers.push(Arc::new(OpenAiDriver::new(&config.openai))),
            "anthropic" => providers.push(Arc::new(AnthropicDriver::new(&config.anthropic))),
            "ollama" => providers.push(Arc::new(OllamaDriver::new(&config.ollama))),
            other => warn!("[P]  Unknown provider '{}' in order, skipping", other),
        }
    }

    providers
}
