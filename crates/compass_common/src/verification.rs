//! Verification pipeline report types.

use serde::{Deserialize, Serialize};

/// Terminal decision of the verification pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Accept,
    Revise,
    Escalate,
}

/// What kind of problem a stage found in the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    FactualMismatch,
    ProfileInconsistency,
    SanitisationAmbiguous,
}

/// How much an issue weighs against confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

/// One recorded problem with a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub detail: String,
}

impl Issue {
    pub fn new(kind: IssueKind, severity: Severity, detail: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            detail: detail.into(),
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageName {
    FactCheck,
    ConsistencyCheck,
    ConfidenceScore,
    Decision,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::FactCheck => "FactCheck",
            StageName::ConsistencyCheck => "ConsistencyCheck",
            StageName::ConfidenceScore => "ConfidenceScore",
            StageName::Decision => "Decision",
        }
    }
}

/// Audit record attached to every generated response. Immutable once
/// attached; never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub decision: Decision,
    /// In [0, 1].
    pub confidence: f64,
    pub issues: Vec<Issue>,
    pub stages_completed: Vec<StageName>,
    pub revision_count: u32,
}

impl VerificationReport {
    pub fn requires_human(&self) -> bool {
        self.decision == Decision::Escalate
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_wire_names() {
        assert_eq!(serde_json::to_string(&Decision::Accept).unwrap(), "\"Accept\"");
        assert_eq!(serde_json::to_string(&Decision::Escalate).unwrap(), "\"Escalate\"");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Major);
        assert!(Severity::Major > Severity::Minor);
    }

    #[test]
    fn test_requires_human_only_on_escalate() {
        let mut report = VerificationReport {
            decision: Decision::Accept,
            confidence: 0.9,
            issues: vec![],
            stages_completed: vec![StageName::FactCheck, StageName::Decision],
            revision_count: 0,
        };
        assert!(!report.requires_human());
        report.decision = Decision::Escalate;
        assert!(report.requires_human());
    }
}
