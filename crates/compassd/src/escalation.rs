//! Escalation sink for low-confidence reports.
//!
//! Escalated responses still go back to the caller with a disclaimer;
//! the ticket goes to asynchronous human review, fire-and-forget.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use compass_common::VerificationReport;

/// What a reviewer needs to triage an escalated response. Carries the
/// fingerprint, never the profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationTicket {
    pub fingerprint: String,
    pub report: VerificationReport,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait EscalationSink: Send + Sync {
    async fn submit(&self, ticket: EscalationTicket);
}

/// Default sink: structured log line an operator can alert on. A queue
/// integration implements the same trait.
pub struct LogEscalationSink;

#[async_trait]
impl EscalationSink for LogEscalationSink {
    async fn submit(&self, ticket: EscalationTicket) {
        warn!(
            "[ESC]  Review needed for {} (confidence {:.2}, {} issue(s))",
            ticket.fingerprint,
            ticket.report.confidence,
            ticket.report.issues.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_common::{Decision, StageName};

    #[tokio::test]
    async fn test_log_sink_accepts_ticket() {
        let sink = LogEscalationSink;
        sink.submit(EscalationTicket {
            fingerprint: "abc123".to_string(),
            report: VerificationReport {
                decision: Decision::Escalate,
                confidence: 0.2,
                issues: vec![],
                stages_completed: vec![StageName::Decision],
                revision_count: 0,
            },
            created_at: Utc::now(),
        })
        .await;
    }
}
