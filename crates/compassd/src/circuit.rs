//! Circuit breaker, one per provider.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, attempts flow normally
    Closed,
    /// Circuit is open, the provider is skipped
    Open,
    /// Circuit is half-open, one probe attempt is allowed
    HalfOpen,
}

/// Tracks recent failures in a sliding window; too many open the
/// circuit, and a cool-down later a half-open probe decides whether the
/// provider has recovered.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: CircuitState,
    /// Failure timestamps within the sliding window
    failures: VecDeque<Instant>,
    /// Success count in half-open state
    success_count: u32,
    /// Failures within the window before opening
    failure_threshold: u32,
    /// Sliding window length
    window: Duration,
    /// Successes required to close from half-open
    success_threshold: u32,
    /// Time when circuit was opened
    opened_at: Option<Instant>,
    /// Cool-down before half-open
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, window: Duration, cooldown: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            failures: VecDeque::new(),
            success_count: 0,
            failure_threshold,
            window,
            success_threshold: 2,
            opened_at: None,
            cooldown,
        }
    }

    /// Record a failed attempt
    pub fn record_failure(&mut self) {
        match self.state {
            CircuitState::Closed => {
                let now = Instant::now();
                self.failures.push_back(now);
                self.prune(now);
                if self.failures.len() as u32 >= self.failure_threshold {
                    self.open();
                }
            }
            CircuitState::HalfOpen => {
                // Failed probe reopens the circuit
                self.open();
            }
            CircuitState::Open => {}
        }
    }

    /// Record a successful attempt
    pub fn record_success(&mut self) {
        match self.state {
            CircuitState::Closed => {
                self.failures.clear();
            }
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= self.success_threshold {
                    self.close();
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Whether attempts should be skipped right now. Transitions to
    /// half-open once the cool-down has elapsed.
    pub fn is_open(&mut self) -> bool {
        if self.state == CircuitState::Open {
            if let Some(opened_at) = self.opened_at {
                if opened_at.elapsed() >= self.cooldown {
                    self.half_open();
                }
            }
        }

        self.state == CircuitState::Open
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.failures.front() {
            if now.duration_since(*oldest) > self.window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.failures.clear();
        self.success_count = 0;
    }

    fn half_open(&mut self) {
        self.state = CircuitState::HalfOpen;
        self.success_count = 0;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.failures.clear();
        self.success_count = 0;
        self.opened_at = None;
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60), Duration::from_secs(30))
    }
}
