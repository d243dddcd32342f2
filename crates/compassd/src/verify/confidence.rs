//! ConfidenceScore stage: deterministic weighted scoring.

use compass_common::{Decision, Issue, Severity};

use crate::config::CagConfig;

/// Weighted confidence in [0, 1]. Starts from full confidence and
/// subtracts per issue by severity, plus a conservative penalty for
/// every stage that could not run.
pub fn score(issues: &[Issue], skipped_stages: usize, config: &CagConfig) -> f64 {
    let mut penalty = 0.0;

    for issue in issues {
        penalty += match issue.severity {
            Severity::Critical => config.weight_critical,
            Severity::Major => config.weight_major,
            Severity::Minor => config.weight_minor,
        };
    }

    penalty += skipped_stages as f64 * config.skipped_stage_penalty;

    (1.0 - penalty).clamp(0.0, 1.0)
}

/// Threshold decision over a confidence score.
pub fn decide(confidence: f64, config: &CagConfig) -> Decision {
    if confidence >= config.accept_threshold {
        Decision::Accept
    } else if confidence >= config.revise_threshold {
        Decision::Revise
    } else {
        Decision::Escalate
    }
}
