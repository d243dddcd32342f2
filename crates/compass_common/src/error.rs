//! Error types for the guidance core.

use thiserror::Error;

/// Failure taxonomy for a guidance request.
///
/// Most variants are recovered locally and never reach the caller as an
/// error: the orchestrator converts them into a well-formed envelope.
#[derive(Error, Debug)]
pub enum GuidanceError {
    #[error("Consent denied: {0}")]
    ConsentDenied(String),

    #[error("Sanitisation ambiguous: {0}")]
    SanitisationAmbiguous(String),

    #[error("Provider timed out: {0}")]
    ProviderTimeout(String),

    #[error("Transient provider error: {0}")]
    ProviderTransient(String),

    #[error("All configured providers exhausted or open")]
    AllProvidersExhausted,

    #[error("Fact store unavailable: {0}")]
    FactStoreUnavailable(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GuidanceError {
    /// Whether the orchestrator may keep serving the request after this
    /// failure (with degraded content) instead of aborting it.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GuidanceError::Io(_) | GuidanceError::Json(_) | GuidanceError::Config(_))
    }
}
