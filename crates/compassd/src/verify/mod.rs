//! Quality verification pipeline.
//!
//! A linear state machine over a single draft:
//! Draft -> FactCheck -> ConsistencyCheck -> ConfidenceScore -> Decision.
//!
//! The two checking stages are independent given the same draft and run
//! joined; scoring and the decision are pure. Re-running the pipeline on
//! the same draft and fact-store snapshot produces the same report.

use std::sync::Arc;
use tracing::{info, warn};

use compass_common::{
    Decision, FactStore, Issue, SanitisedProfile, StageName, VerificationReport,
};

use crate::config::CagConfig;

pub mod confidence;
pub mod consistency;
pub mod factcheck;

pub struct VerificationPipeline {
    fact_store: Arc<dyn FactStore>,
    config: CagConfig,
}

impl VerificationPipeline {
    pub fn new(fact_store: Arc<dyn FactStore>, config: CagConfig) -> Self {
        Self { fact_store, config }
    }

    pub fn config(&self) -> &CagConfig {
        &self.config
    }

    /// Run every stage over a draft. Fact-store unavailability degrades
    /// FactCheck to skipped instead of failing the request; skipped
    /// stages are scored conservatively.
    pub async fn verify(&self, draft: &str, profile: &SanitisedProfile) -> VerificationReport {
        let mut stages_completed = Vec::new();
        let mut issues: Vec<Issue> = Vec::new();
        let mut skipped_stages = 0;

        let (fact_outcome, consistency_issues) = tokio::join!(
            self.run_factcheck(draft),
            std::future::ready(consistency::check(draft, profile)),
        );

        match fact_outcome {
            Some(fact_issues) => {
                stages_completed.push(StageName::FactCheck);
                issues.extend(fact_issues);
            }
            None => {
                skipped_stages += 1;
            }
        }

        stages_completed.push(StageName::ConsistencyCheck);
        issues.extend(consistency_issues);

        let confidence = confidence::score(&issues, skipped_stages, &self.config);
        stages_completed.push(StageName::ConfidenceScore);

        let decision = confidence::decide(confidence, &self.config);
        stages_completed.push(StageName::Decision);

        info!(
            "[V]  Verified draft: {:?} (confidence {:.2}, {} issue(s))",
            decision,
            confidence,
            issues.len()
        );

        VerificationReport {
            decision,
            confidence,
            issues,
            stages_completed,
            revision_count: 0,
        }
    }

    async fn run_factcheck(&self, draft: &str) -> Option<Vec<Issue>> {
        match self.fact_store.snapshot().await {
            Ok(snapshot) => Some(factcheck::check(draft, &snapshot)),
            Err(e) => {
                warn!("[V]  Fact store unavailable, skipping FactCheck: {}", e);
                None
            }
        }
    }
}

/// Correction instructions for the single revision attempt, assembled
/// from issue details only.
pub fn correction_from_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| format!("- {}", issue.detail))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One decision only warrants a regeneration attempt.
pub fn wants_revision(decision: Decision) -> bool {
    decision == Decision::Revise
}
