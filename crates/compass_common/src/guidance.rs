//! Request and response envelopes for the guidance operation.

use serde::{Deserialize, Serialize};

use crate::profile::{RawProfile, SanitisedProfile, Session};
use crate::provider::GenerationParams;
use crate::verification::{Decision, VerificationReport};

/// Inbound request from the assessment front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceQuery {
    pub query: String,
    pub profile: RawProfile,
    pub session: Session,
}

/// De-identified request. The only object ever passed to the guarded
/// client, and through it to a provider driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceRequest {
    pub query: String,
    pub profile: SanitisedProfile,
    /// Correction instructions for the single revision attempt. Built
    /// from verification issues only, never from raw profile fields.
    #[serde(default)]
    pub correction: Option<String>,
    #[serde(default)]
    pub params: GenerationParams,
}

impl GuidanceRequest {
    pub fn new(query: impl Into<String>, profile: SanitisedProfile, params: GenerationParams) -> Self {
        Self {
            query: query.into(),
            profile,
            correction: None,
            params,
        }
    }

    pub fn with_correction(mut self, correction: impl Into<String>) -> Self {
        self.correction = Some(correction.into());
        self
    }
}

/// Where the response text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Generated,
    Cache,
    Draft,
}

/// Which compliance blockers the request passed through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceBlock {
    pub consent: bool,
    pub sanitised: bool,
    pub cag_verified: bool,
}

/// Verification summary surfaced to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CagBlock {
    pub decision: Decision,
    pub confidence: f64,
    pub processing_time_ms: u64,
    pub issues_detected: usize,
    pub revisions_applied: u32,
    pub requires_human: bool,
    pub stages_completed: Vec<String>,
}

impl CagBlock {
    pub fn from_report(report: &VerificationReport, processing_time_ms: u64) -> Self {
        Self {
            decision: report.decision,
            confidence: report.confidence,
            processing_time_ms,
            issues_detected: report.issue_count(),
            revisions_applied: report.revision_count,
            requires_human: report.requires_human(),
            stages_completed: report
                .stages_completed
                .iter()
                .map(|stage| stage.as_str().to_string())
                .collect(),
        }
    }
}

/// Externally visible result. Always well-formed: failures inside the
/// pipeline surface as safe content, never as an error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceResponse {
    pub success: bool,
    pub response: String,
    pub source: ResponseSource,
    pub compliance: ComplianceBlock,
    /// Absent when no verification ran (consent-denied draft, provider
    /// fallback).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cag: Option<CagBlock>,
}
