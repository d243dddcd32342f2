//! Request orchestration.
//!
//! Sequences consent gate -> sanitiser -> cache -> guarded client ->
//! verification -> output scrub into one "generate guidance" operation
//! and assembles the response envelope. Every failure mode ends in a
//! well-formed, safe response; the caller never sees a raw error.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use compass_common::{
    CagBlock, ComplianceBlock, Decision, FactStore, Fingerprint, GenerationParams, GuidanceError,
    GuidanceQuery, GuidanceRequest, GuidanceResponse, Issue, IssueKind, RawProfile,
    ResponseSource, Severity,
};

use crate::cache::{CacheEntry, Computed, ResponseCache};
use crate::config::Config;
use crate::consent::{self, Admission};
use crate::escalation::{EscalationSink, EscalationTicket};
use crate::guarded::GuardedClient;
use crate::providers::ProviderAdapter;
use crate::sanitise::{self, ScrubOutcome};
use crate::stats::VerificationStats;
use crate::verify::{self, VerificationPipeline};

pub struct Orchestrator {
    config: Config,
    guarded: GuardedClient,
    cache: ResponseCache,
    pipeline: VerificationPipeline,
    escalation: Arc<dyn EscalationSink>,
    stats: Arc<RwLock<VerificationStats>>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        providers: Vec<Arc<dyn ProviderAdapter>>,
        fact_store: Arc<dyn FactStore>,
        escalation: Arc<dyn EscalationSink>,
    ) -> Self {
        let guarded = GuardedClient::new(providers, &config.providers, &config.breaker);
        let cache = ResponseCache::new(&config.cache);
        let pipeline = VerificationPipeline::new(fact_store, config.cag.clone());

        Self {
            config,
            guarded,
            cache,
            pipeline,
            escalation,
            stats: Arc::new(RwLock::new(VerificationStats::default())),
        }
    }

    pub fn stats(&self) -> Arc<RwLock<VerificationStats>> {
        self.stats.clone()
    }

    /// The single user-facing operation.
    pub async fn generate(&self, query: GuidanceQuery) -> GuidanceResponse {
        let request_id = Uuid::new_v4();
        info!("[Q]  {} Processing guidance request", request_id);

        // Consent gate: deny short-circuits before anything touches the
        // profile or the network
        if let Admission::Deny(reason) = consent::admit(&query.session, self.config.consent.max_age_months)
        {
            info!("[Q]  {} Denied by consent gate: {}", request_id, reason.as_str());
            return self.draft_response();
        }

        // Request-direction sanitisation; only this output may travel on
        let sanitised = sanitise::sanitise_profile(&query.profile);
        let request = GuidanceRequest::new(
            query.query.clone(),
            sanitised,
            GenerationParams {
                max_tokens: self.config.providers.max_tokens,
                temperature: self.config.providers.temperature,
            },
        );
        let fingerprint = Fingerprint::of(&request);

        let outcome = self
            .cache
            .get_or_compute(&fingerprint, || {
                self.generate_verified(&request, &query.profile, &fingerprint)
            })
            .await;

        match outcome {
            Ok((entry, from_cache)) => {
                let mut response = entry.response;
                if from_cache {
                    info!("[Q]  {} Served from cache ({})", request_id, fingerprint);
                    response.source = ResponseSource::Cache;
                    // Shared entries were scrubbed against the profile
                    // that generated them; this caller's identifiers get
                    // their own pass before anything leaves
                    match sanitise::scrub_output(&response.response, &query.profile) {
                        ScrubOutcome::Clean(text) | ScrubOutcome::Scrubbed(text) => {
                            response.response = text;
                        }
                        ScrubOutcome::Ambiguous { reason } => {
                            warn!("[Q]  {} Cached entry uncertifiable: {}", request_id, reason);
                            return self.fallback_response();
                        }
                    }
                }
                response
            }
            Err(e) => {
                warn!("[Q]  {} Degraded to fallback: {}", request_id, e);
                self.fallback_response()
            }
        }
    }

    /// Generation plus the full verification pipeline. Runs at most once
    /// per fingerprint across concurrent callers.
    async fn generate_verified(
        &self,
        request: &GuidanceRequest,
        raw_profile: &RawProfile,
        fingerprint: &Fingerprint,
    ) -> Result<Computed, GuidanceError> {
        let started = Instant::now();

        let call = self.guarded.call(request).await?;
        let mut text = call.text;
        let mut report = self.pipeline.verify(&text, &request.profile).await;

        // Exactly one regeneration attempt, with the issues fed back as
        // correction instructions, then one re-score
        if verify::wants_revision(report.decision) {
            let correction = verify::correction_from_issues(&report.issues);
            let revised_request = request.clone().with_correction(correction);

            match self.guarded.call(&revised_request).await {
                Ok(second) => {
                    let mut second_report =
                        self.pipeline.verify(&second.text, &request.profile).await;
                    second_report.revision_count = 1;
                    text = second.text;
                    report = second_report;
                }
                Err(e) => {
                    // No provider left to revise with; the draft cannot
                    // be repaired, so it goes to review instead
                    warn!("[Q]  Revision attempt failed ({}), escalating", e);
                    report.decision = Decision::Escalate;
                    report.revision_count = 1;
                }
            }
        }

        // Response-direction scrub; an uncertifiable result never leaves
        let mut response_text = match sanitise::scrub_output(&text, raw_profile) {
            ScrubOutcome::Clean(clean) | ScrubOutcome::Scrubbed(clean) => clean,
            ScrubOutcome::Ambiguous { reason } => {
                warn!("[Q]  Scrub could not certify output: {}", reason);
                report.issues.push(Issue::new(
                    IssueKind::SanitisationAmbiguous,
                    Severity::Critical,
                    reason,
                ));
                report.decision = Decision::Escalate;
                self.config.daemon.fallback_text.clone()
            }
        };

        if report.decision == Decision::Escalate {
            response_text.push_str("\n\n");
            response_text.push_str(&self.config.daemon.escalation_disclaimer);

            let ticket = EscalationTicket {
                fingerprint: fingerprint.as_str().to_string(),
                report: report.clone(),
                created_at: chrono::Utc::now(),
            };
            let sink = self.escalation.clone();
            tokio::spawn(async move { sink.submit(ticket).await });
        }

        let processing_ms = started.elapsed().as_millis() as u64;
        self.stats.write().await.record(report.decision, processing_ms);

        let response = GuidanceResponse {
            success: true,
            response: response_text,
            source: ResponseSource::Generated,
            compliance: ComplianceBlock {
                consent: true,
                sanitised: true,
                cag_verified: report.decision != Decision::Escalate,
            },
            cag: Some(CagBlock::from_report(&report, processing_ms)),
        };

        // Only fully accepted responses are worth replaying to others
        let store = report.decision == Decision::Accept;
        Ok(Computed {
            entry: CacheEntry::new(fingerprint.clone(), response, report, self.cache.ttl()),
            store,
        })
    }

    /// Static, non-personalised guidance when consent denies processing.
    fn draft_response(&self) -> GuidanceResponse {
        GuidanceResponse {
            success: true,
            response: self.config.daemon.draft_text.clone(),
            source: ResponseSource::Draft,
            compliance: ComplianceBlock {
                consent: false,
                sanitised: false,
                cag_verified: false,
            },
            cag: None,
        }
    }

    /// Safe generic message when every provider is exhausted.
    fn fallback_response(&self) -> GuidanceResponse {
        GuidanceResponse {
            success: true,
            response: self.config.daemon.fallback_text.clone(),
            source: ResponseSource::Draft,
            compliance: ComplianceBlock {
                consent: true,
                sanitised: true,
                cag_verified: false,
            },
            cag: None,
        }
    }
}
