//! Guarded provider client.
//!
//! Attempts providers strictly in priority order, one at a time. Each
//! attempt is bounded by a fixed wall-clock timeout, so the whole call
//! stage is bounded by providers x per-attempt timeout. A provider that
//! keeps failing is skipped via its circuit breaker until the cool-down
//! passes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use compass_common::{GuidanceError, GuidanceRequest, ProviderCallResult};

use crate::circuit::{CircuitBreaker, CircuitState};
use crate::config::{BreakerConfig, ProvidersConfig};
use crate::providers::ProviderAdapter;

pub struct GuardedClient {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    breakers: Mutex<HashMap<String, CircuitBreaker>>,
    attempt_timeout: Duration,
    breaker_config: BreakerConfig,
}

impl GuardedClient {
    pub fn new(
        providers: Vec<Arc<dyn ProviderAdapter>>,
        providers_config: &ProvidersConfig,
        breaker_config: &BreakerConfig,
    ) -> Self {
        Self {
            providers,
            breakers: Mutex::new(HashMap::new()),
            attempt_timeout: Duration::from_millis(providers_config.attempt_timeout_ms),
            breaker_config: breaker_config.clone(),
        }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Breaker state for introspection; `Closed` for unseen providers.
    pub fn breaker_state(&self, provider_id: &str) -> CircuitState {
        self.breakers
            .lock()
            .expect("breaker lock poisoned")
            .get(provider_id)
            .map(|breaker| breaker.state())
            .unwrap_or(CircuitState::Closed)
    }

    /// Try each provider in order until one succeeds. Never runs two
    /// providers in parallel: the latency bound comes from per-attempt
    /// timeouts, and sequential attempts avoid duplicate billed calls.
    pub async fn call(&self, request: &GuidanceRequest) -> Result<ProviderCallResult, GuidanceError> {
        if self.providers.is_empty() {
            return Err(GuidanceError::AllProvidersExhausted);
        }

        for provider in &self.providers {
            let id = provider.id().to_string();

            if self.breaker_open(&id) {
                debug!("[C]  Circuit open for '{}', skipping", id);
                continue;
            }

            let started = Instant::now();
            match tokio::time::timeout(self.attempt_timeout, provider.complete(request)).await {
                Ok(result) if result.succeeded => {
                    self.record(&id, true);
                    info!(
                        "[+]  Provider '{}' answered in {}ms",
                        id,
                        started.elapsed().as_millis()
                    );
                    return Ok(result);
                }
                Ok(result) => {
                    self.record(&id, false);
                    warn!(
                        "[-]  Provider '{}' failed ({:?}), trying next",
                        id, result.error_kind
                    );
                }
                Err(_elapsed) => {
                    self.record(&id, false);
                    warn!(
                        "[-]  Provider '{}' timed out after {}ms, trying next",
                        id,
                        self.attempt_timeout.as_millis()
                    );
                }
            }
        }

        warn!("[-]  Every provider exhausted or open");
        Err(GuidanceError::AllProvidersExhausted)
    }

    fn breaker_open(&self, provider_id: &str) -> bool {
        let mut breakers = self.breakers.lock().expect("breaker lock poisoned");
        breakers
            .entry(provider_id.to_string())
            .or_insert_with(|| self.new_breaker())
            .is_open()
    }

    fn record(&self, provider_id: &str, success: bool) {
        let mut breakers = self.breakers.lock().expect("breaker lock poisoned");
        let breaker = breakers
            .entry(provider_id.to_string())
            .or_insert_with(|| self.new_breaker());
        if success {
            breaker.record_success();
        } else {
            breaker.record_failure();
        }
    }

    fn new_breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(
            self.breaker_config.failure_threshold,
            Duration::from_secs(self.breaker_config.window_secs),
            Duration::from_secs(self.breaker_config.cooldown_secs),
        )
    }
}
