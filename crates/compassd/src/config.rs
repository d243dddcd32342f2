//! Configuration management for compassd.
//!
//! Loads settings from /etc/compass/config.toml or uses defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/compass/config.toml";

/// Default config file path for fallback
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/compass/config.toml";

/// Consent gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    /// Consent captured more than this many months ago is stale
    #[serde(default = "default_consent_max_age_months")]
    pub max_age_months: u32,
}

fn default_consent_max_age_months() -> u32 {
    12
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            max_age_months: default_consent_max_age_months(),
        }
    }
}

/// Provider failover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Priority order of provider drivers
    #[serde(default = "default_provider_order")]
    pub order: Vec<String>,

    /// Wall-clock budget per provider attempt in milliseconds
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_ms: u64,

    /// Completion length cap, provider-agnostic
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature, provider-agnostic
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

fn default_provider_order() -> Vec<String> {
    vec![
        "openai".to_string(),
        "anthropic".to_string(),
        "ollama".to_string(),
    ]
}

fn default_attempt_timeout() -> u64 {
    5_000
}

fn default_max_tokens() -> u32 {
    700
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: default_provider_order(),
            attempt_timeout_ms: default_attempt_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            openai: OpenAiConfig::default(),
            anthropic: AnthropicConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_openai_key_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    #[serde(default = "default_anthropic_model")]
    pub model: String,

    #[serde(default = "default_anthropic_key_env")]
    pub api_key_env: String,
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
            api_key_env: default_anthropic_key_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_ollama_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

/// Circuit breaker configuration, applied per provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Failures within the window before the circuit opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Sliding failure window in seconds
    #[serde(default = "default_failure_window")]
    pub window_secs: u64,

    /// Cool-down before a half-open probe is allowed
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_failure_window() -> u64 {
    60
}

fn default_cooldown() -> u64 {
    30
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            window_secs: default_failure_window(),
            cooldown_secs: default_cooldown(),
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum cached fingerprints before LRU eviction
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_capacity() -> usize {
    512
}

fn default_cache_ttl() -> u64 {
    3_600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Verification pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CagConfig {
    /// Confidence at or above this accepts the draft
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f64,

    /// Confidence at or above this (but below accept) triggers the
    /// single revision attempt; below it the draft escalates
    #[serde(default = "default_revise_threshold")]
    pub revise_threshold: f64,

    /// Confidence penalty per critical issue
    #[serde(default = "default_weight_critical")]
    pub weight_critical: f64,

    /// Confidence penalty per major issue
    #[serde(default = "default_weight_major")]
    pub weight_major: f64,

    /// Confidence penalty per minor issue
    #[serde(default = "default_weight_minor")]
    pub weight_minor: f64,

    /// Conservative penalty when a stage could not run
    #[serde(default = "default_skipped_penalty")]
    pub skipped_stage_penalty: f64,
}

fn default_accept_threshold() -> f64 {
    0.8
}

fn default_revise_threshold() -> f64 {
    0.5
}

fn default_weight_critical() -> f64 {
    0.35
}

fn default_weight_major() -> f64 {
    0.2
}

fn default_weight_minor() -> f64 {
    0.08
}

fn default_skipped_penalty() -> f64 {
    0.15
}

impl Default for CagConfig {
    fn default() -> Self {
        Self {
            accept_threshold: default_accept_threshold(),
            revise_threshold: default_revise_threshold(),
            weight_critical: default_weight_critical(),
            weight_major: default_weight_major(),
            weight_minor: default_weight_minor(),
            skipped_stage_penalty: default_skipped_penalty(),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for the HTTP surface
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Static text returned when consent denies external processing
    #[serde(default = "default_draft_text")]
    pub draft_text: String,

    /// Static text returned when every provider is exhausted or a result
    /// cannot be certified clean
    #[serde(default = "default_fallback_text")]
    pub fallback_text: String,

    /// Disclaimer appended to escalated responses
    #[serde(default = "default_escalation_disclaimer")]
    pub escalation_disclaimer: String,
}

fn default_bind_addr() -> String {
    // Localhost only; TLS and external exposure are terminated upstream
    "127.0.0.1:7870".to_string()
}

fn default_draft_text() -> String {
    "Here is some general career guidance. Explore fields that match the \
     subjects you enjoy most, compare admission requirements for several \
     institutions on their official pages, and speak to your school's life \
     orientation teacher about application timelines. To receive guidance \
     tailored to your marks and interests, consent to processing on your \
     profile page."
        .to_string()
}

fn default_fallback_text() -> String {
    "We could not generate personalised guidance right now. Your marks and \
     interests remain a strong starting point: shortlist programmes whose \
     subject requirements you already meet, and verify admission scores and \
     bursary deadlines on the institutions' official pages. Please try again \
     in a few minutes."
        .to_string()
}

fn default_escalation_disclaimer() -> String {
    "Note: this guidance could not be fully verified against our records and \
     has been queued for review by a counsellor. Please double-check any \
     figures or deadlines before acting on them."
        .to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            draft_text: default_draft_text(),
            fallback_text: default_fallback_text(),
            escalation_disclaimer: default_escalation_disclaimer(),
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub consent: ConsentConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub breaker: BreakerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub cag: CagConfig,
}

impl Config {
    /// Load config from file, or return defaults
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(DEFAULT_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            })
    }

    /// Load config from specific path
    pub fn load_from_path(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path);
        Ok(config)
    }

    /// Save default config to path (for init)
    pub fn save_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)?;
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.providers.attempt_timeout_ms, 5_000);
        assert_eq!(config.providers.order.len(), 3);
        assert_eq!(config.consent.max_age_months, 12);
        assert!(config.cag.accept_threshold > config.cag.revise_threshold);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[providers]
order = ["ollama"]
attempt_timeout_ms = 2500

[cag]
accept_threshold = 0.9
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.providers.order, vec!["ollama".to_string()]);
        assert_eq!(config.providers.attempt_timeout_ms, 2_500);
        assert_eq!(config.cag.accept_threshold, 0.9);
        // Defaults for missing fields
        assert_eq!(config.cag.revise_threshold, 0.5);
        assert_eq!(config.cache.capacity, 512);
    }

    #[test]
    fn test_config_invalid_section_falls_back_safely() {
        let toml_str = r#"
[cache]
# Missing fields - should use defaults
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cache.ttl_secs, 3_600);
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        Config::save_default(path_str).unwrap();
        let config = Config::load_from_path(path_str).unwrap();
        assert_eq!(config.providers.max_tokens, 700);
        assert_eq!(config.breaker.failure_threshold, 3);
    }
}
