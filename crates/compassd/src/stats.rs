//! Aggregate verification statistics for the health endpoint.

use serde::{Deserialize, Serialize};

use compass_common::Decision;

/// Running tallies over every verification that completed.
#[derive(Debug, Default)]
pub struct VerificationStats {
    count: u64,
    total_processing_ms: u64,
    accepted: u64,
    revised: u64,
    escalated: u64,
}

/// Point-in-time copy for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatsSnapshot {
    pub verified_count: u64,
    pub avg_processing_ms: u64,
    pub accepted: u64,
    pub revised: u64,
    pub escalated: u64,
}

impl VerificationStats {
    pub fn record(&mut self, decision: Decision, processing_ms: u64) {
        self.count += 1;
        self.total_processing_ms += processing_ms;
        match decision {
            Decision::Accept => self.accepted += 1,
            Decision::Revise => self.revised += 1,
            Decision::Escalate => self.escalated += 1,
        }
    }

    pub fn snapshot(&self) -> VerificationStatsSnapshot {
        VerificationStatsSnapshot {
            verified_count: self.count,
            avg_processing_ms: if self.count == 0 {
                0
            } else {
                self.total_processing_ms / self.count
            },
            accepted: self.accepted,
            revised: self.revised,
            escalated: self.escalated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let stats = VerificationStats::default();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.verified_count, 0);
        assert_eq!(snapshot.avg_processing_ms, 0);
    }

    #[test]
    fn test_record_and_average() {
        let mut stats = VerificationStats::default();
        stats.record(Decision::Accept, 100);
        stats.record(Decision::Revise, 300);
        stats.record(Decision::Escalate, 200);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.verified_count, 3);
        assert_eq!(snapshot.avg_processing_ms, 200);
        assert_eq!(snapshot.accepted, 1);
        assert_eq!(snapshot.revised, 1);
        assert_eq!(snapshot.escalated, 1);
    }
}
