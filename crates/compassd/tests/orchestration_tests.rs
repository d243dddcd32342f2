//! Deterministic orchestration tests.
//!
//! These tests use scripted providers and fixture fact stores to verify
//! the full guidance flow without any network calls.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use compass_common::{
    Decision, FactSnapshot, FactStore, FactStoreError, GuidanceQuery, GuidanceRequest,
    ProviderCallResult, ProviderErrorKind, RawProfile, ResponseSource, Session, StaticFactStore,
};
use compassd::config::Config;
use compassd::escalation::LogEscalationSink;
use compassd::orchestrator::Orchestrator;
use compassd::providers::ProviderAdapter;

// ============================================================================
// Fakes
// ============================================================================

enum Script {
    /// Always return the same draft
    Fixed(&'static str),
    /// Return `first` until a correction is attached, then `corrected`
    Corrigible {
        first: &'static str,
        corrected: &'static str,
    },
    /// Never answer within any sane timeout
    Hang,
    /// Fail with a classified error
    Fail(ProviderErrorKind),
}

struct ScriptedProvider {
    id: String,
    calls: AtomicUsize,
    script: Script,
}

impl ScriptedProvider {
    fn new(id: &str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            calls: AtomicUsize::new(0),
            script,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &GuidanceRequest) -> ProviderCallResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Fixed(text) => ProviderCallResult::success(&self.id, *text, 15),
            Script::Corrigible { first, corrected } => {
                let text = if request.correction.is_some() {
                    corrected
                } else {
                    first
                };
                ProviderCallResult::success(&self.id, *text, 15)
            }
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("hung provider should be timed out")
            }
            Script::Fail(kind) => ProviderCallResult::failure(&self.id, *kind, 15),
        }
    }
}

struct DownFactStore;

#[async_trait]
impl FactStore for DownFactStore {
    async fn snapshot(&self) -> Result<FactSnapshot, FactStoreError> {
        Err(FactStoreError::Unavailable("connection refused".to_string()))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

const GOOD_DRAFT: &str = "Engineering at the University of the Witwatersrand requires an APS \
     of 42. Your marks in Mathematics are an excellent base. Compare programmes early.";

const BAD_APS_DRAFT: &str = "Engineering at the University of the Witwatersrand requires an APS \
     of 30. Your marks in Mathematics are an excellent base.";

const PII_DRAFT: &str = "Thandi, well done on your results. Engineering at the University of \
     the Witwatersrand requires an APS of 42. Learners from Ridgeview High do well there.";

const EMBEDDED_PII_DRAFT: &str = "The Nkosified programme list covers every province. Your marks \
     in Mathematics are an excellent base.";

fn test_config(timeout_ms: u64) -> Config {
    let mut config = Config::default();
    config.providers.attempt_timeout_ms = timeout_ms;
    config
}

fn orchestrator(providers: Vec<Arc<dyn ProviderAdapter>>) -> Orchestrator {
    Orchestrator::new(
        test_config(1_000),
        providers,
        Arc::new(StaticFactStore::with_defaults()),
        Arc::new(LogEscalationSink),
    )
}

fn profile() -> RawProfile {
    RawProfile {
        name: Some("Thandi".to_string()),
        surname: Some("Nkosi".to_string()),
        school_name: Some("Ridgeview High".to_string()),
        town: Some("Soweto".to_string()),
        marks: BTreeMap::from([
            ("Mathematics".to_string(), 78),
            ("Physical Sciences".to_string(), 71),
        ]),
        interests: vec!["engineering".to_string()],
    }
}

fn query(text: &str, session: Session) -> GuidanceQuery {
    GuidanceQuery {
        query: text.to_string(),
        profile: profile(),
        session,
    }
}

fn consented_query(text: &str) -> GuidanceQuery {
    query(text, Session::consented(Utc::now()))
}

// ============================================================================
// Consent Gate
// ============================================================================

/// Consent withheld: draft response, no provider is ever called
#[tokio::test]
async fn test_consent_denied_short_circuits() {
    let provider = ScriptedProvider::new("fake", Script::Fixed(GOOD_DRAFT));
    let orchestrator = orchestrator(vec![provider.clone()]);

    let response = orchestrator
        .generate(query("career options?", Session::withheld()))
        .await;

    assert!(response.success);
    assert_eq!(response.source, ResponseSource::Draft);
    assert!(!response.compliance.consent);
    assert!(response.cag.is_none());
    assert_eq!(provider.calls(), 0);
}

/// Stale consent is treated like no consent
#[tokio::test]
async fn test_stale_consent_denied() {
    let provider = ScriptedProvider::new("fake", Script::Fixed(GOOD_DRAFT));
    let orchestrator = orchestrator(vec![provider.clone()]);

    let stale = Session::consented(Utc::now() - ChronoDuration::days(800));
    let response = orchestrator.generate(query("career options?", stale)).await;

    assert_eq!(response.source, ResponseSource::Draft);
    assert_eq!(provider.calls(), 0);
}

// ============================================================================
// Accept / Revise Flows
// ============================================================================

/// Clean draft with a correct threshold is accepted first pass
#[tokio::test]
async fn test_verified_draft_accepted() {
    let provider = ScriptedProvider::new("fake", Script::Fixed(GOOD_DRAFT));
    let orchestrator = orchestrator(vec![provider.clone()]);

    let response = orchestrator
        .generate(consented_query(
            "career options for strong Mathematics and Physical Sciences marks",
        ))
        .await;

    assert!(response.success);
    assert_eq!(response.source, ResponseSource::Generated);
    assert!(response.compliance.cag_verified);

    let cag = response.cag.expect("verified response carries a cag block");
    assert_eq!(cag.decision, Decision::Accept);
    assert!(cag.confidence >= 0.8);
    assert_eq!(cag.revisions_applied, 0);
    assert_eq!(cag.issues_detected, 0);
    assert_eq!(provider.calls(), 1);
}

/// Wrong threshold: one regeneration with corrections, then accepted
#[tokio::test]
async fn test_factual_mismatch_revised_once_and_fixed() {
    let provider = ScriptedProvider::new(
        "fake",
        Script::Corrigible {
            first: BAD_APS_DRAFT,
            corrected: GOOD_DRAFT,
        },
    );
    let orchestrator = orchestrator(vec![provider.clone()]);

    let response = orchestrator.generate(consented_query("engineering?")).await;

    let cag = response.cag.expect("cag block present");
    assert_eq!(cag.decision, Decision::Accept);
    assert_eq!(cag.revisions_applied, 1);
    // Exactly one regeneration: first draft + one corrected draft
    assert_eq!(provider.calls(), 2);
}

/// Revision that does not fix the draft is not retried again
#[tokio::test]
async fn test_revision_never_loops() {
    let provider = ScriptedProvider::new("fake", Script::Fixed(BAD_APS_DRAFT));
    let orchestrator = orchestrator(vec![provider.clone()]);

    let response = orchestrator.generate(consented_query("engineering?")).await;

    let cag = response.cag.expect("cag block present");
    assert_eq!(cag.decision, Decision::Revise);
    assert_eq!(cag.revisions_applied, 1);
    assert!(cag.issues_detected >= 1);
    assert_eq!(provider.calls(), 2);
}

// ============================================================================
// PII Scrubbing
// ============================================================================

/// Echoed identifiers never reach the caller
#[tokio::test]
async fn test_echoed_identifiers_scrubbed() {
    let provider = ScriptedProvider::new("fake", Script::Fixed(PII_DRAFT));
    let orchestrator = orchestrator(vec![provider]);

    let response = orchestrator.generate(consented_query("engineering?")).await;

    let lowered = response.response.to_lowercase();
    assert!(!lowered.contains("thandi"));
    assert!(!lowered.contains("nkosi"));
    assert!(!lowered.contains("ridgeview"));
    // The clean sentence survives
    assert!(response.response.contains("APS"));
}

/// An identifier fragment that cannot be certified clean escalates and
/// returns safe text instead of the draft
#[tokio::test]
async fn test_ambiguous_scrub_escalates() {
    let provider = ScriptedProvider::new("fake", Script::Fixed(EMBEDDED_PII_DRAFT));
    let orchestrator = orchestrator(vec![provider]);

    let response = orchestrator.generate(consented_query("engineering?")).await;

    assert!(response.success);
    assert!(!response.compliance.cag_verified);
    let lowered = response.response.to_lowercase();
    assert!(!lowered.contains("nkosi"));

    let cag = response.cag.expect("cag block present");
    assert_eq!(cag.decision, Decision::Escalate);
    assert!(cag.requires_human);
}

// ============================================================================
// Provider Failover
// ============================================================================

/// Every provider hangs: safe fallback inside the latency bound
#[tokio::test]
async fn test_all_providers_hang_returns_fallback_within_bound() {
    let providers: Vec<Arc<dyn ProviderAdapter>> = vec![
        ScriptedProvider::new("a", Script::Hang),
        ScriptedProvider::new("b", Script::Hang),
        ScriptedProvider::new("c", Script::Hang),
    ];
    let orchestrator = Orchestrator::new(
        test_config(100),
        providers,
        Arc::new(StaticFactStore::with_defaults()),
        Arc::new(LogEscalationSink),
    );

    let started = Instant::now();
    let response = orchestrator.generate(consented_query("engineering?")).await;
    let elapsed = started.elapsed();

    assert!(response.success);
    assert_eq!(response.source, ResponseSource::Draft);
    assert!(!response.response.is_empty());
    // 3 providers x 100ms plus scheduling slack
    assert!(elapsed < Duration::from_millis(1_500), "took {:?}", elapsed);
}

/// A failing provider falls through to the next one in order
#[tokio::test]
async fn test_failover_to_second_provider() {
    let first = ScriptedProvider::new("first", Script::Fail(ProviderErrorKind::RateLimited));
    let second = ScriptedProvider::new("second", Script::Fixed(GOOD_DRAFT));
    let orchestrator = orchestrator(vec![first.clone(), second.clone()]);

    let response = orchestrator.generate(consented_query("engineering?")).await;

    assert_eq!(response.source, ResponseSource::Generated);
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
}

// ============================================================================
// Response Cache
// ============================================================================

/// Identical request twice: second is served from cache without another
/// provider call
#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let provider = ScriptedProvider::new("fake", Script::Fixed(GOOD_DRAFT));
    let orchestrator = orchestrator(vec![provider.clone()]);

    let first = orchestrator.generate(consented_query("engineering?")).await;
    assert_eq!(first.source, ResponseSource::Generated);

    let second = orchestrator.generate(consented_query("engineering?")).await;
    assert_eq!(second.source, ResponseSource::Cache);
    assert_eq!(second.response, first.response);
    // The stored verification report is returned unchanged
    assert_eq!(
        second.cag.as_ref().map(|c| c.confidence),
        first.cag.as_ref().map(|c| c.confidence)
    );
    assert_eq!(provider.calls(), 1);
}

/// Concurrent identical requests trigger exactly one generation
#[tokio::test]
async fn test_concurrent_identical_requests_deduplicated() {
    let provider = ScriptedProvider::new("fake", Script::Fixed(GOOD_DRAFT));
    let orchestrator = Arc::new(orchestrator(vec![provider.clone()]));

    let mut handles = Vec::new();
    for _ in 0..12 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.generate(consented_query("engineering?")).await
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap();
        assert!(response.success);
        assert!(response.response.contains("APS"));
    }

    assert_eq!(provider.calls(), 1);
}

/// Escalated responses are never replayed from the cache
#[tokio::test]
async fn test_escalated_response_not_cached() {
    let provider = ScriptedProvider::new("fake", Script::Fixed(EMBEDDED_PII_DRAFT));
    let orchestrator = orchestrator(vec![provider.clone()]);

    let first = orchestrator.generate(consented_query("engineering?")).await;
    let second = orchestrator.generate(consented_query("engineering?")).await;

    assert_eq!(first.cag.unwrap().decision, Decision::Escalate);
    assert_eq!(second.source, ResponseSource::Generated);
    // Both requests generated fresh drafts
    assert!(provider.calls() >= 2);
}

// ============================================================================
// Degraded Fact Store
// ============================================================================

/// A down fact store skips FactCheck instead of failing the request
#[tokio::test]
async fn test_down_fact_store_degrades_gracefully() {
    let provider = ScriptedProvider::new("fake", Script::Fixed(GOOD_DRAFT));
    let orchestrator = Orchestrator::new(
        test_config(1_000),
        vec![provider],
        Arc::new(DownFactStore),
        Arc::new(LogEscalationSink),
    );

    let response = orchestrator.generate(consented_query("engineering?")).await;

    assert!(response.success);
    let cag = response.cag.expect("cag block present");
    assert!(!cag.stages_completed.contains(&"FactCheck".to_string()));
    assert!(cag.stages_completed.contains(&"ConsistencyCheck".to_string()));
    // Conservative penalty applied for the skipped stage
    assert!(cag.confidence < 1.0);
}
