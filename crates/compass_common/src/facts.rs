//! Structured domain facts consumed by fact-checking.
//!
//! The real store is populated by an external ingestion pipeline; this
//! core only reads snapshots. Verification is deterministic given the
//! same draft and the same snapshot.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactStoreError {
    #[error("Fact store unavailable: {0}")]
    Unavailable(String),
}

/// One verifiable domain fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Fact {
    /// Minimum admission points score (APS) for a programme.
    AdmissionThreshold {
        institution: String,
        programme: String,
        aps: u32,
    },
    /// Application deadline for a bursary.
    BursaryDeadline { bursary: String, deadline: NaiveDate },
    /// Median annual salary for an occupation, in rand.
    SalaryFigure { occupation: String, annual_rand: u64 },
}

/// Read-only view of the store at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactSnapshot {
    pub facts: Vec<Fact>,
}

impl FactSnapshot {
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Read-only fact lookup, queried by the FactCheck stage.
#[async_trait]
pub trait FactStore: Send + Sync {
    async fn snapshot(&self) -> Result<FactSnapshot, FactStoreError>;
}

/// In-memory store for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticFactStore {
    snapshot: FactSnapshot,
}

impl StaticFactStore {
    pub fn new(facts: Vec<Fact>) -> Self {
        Self {
            snapshot: FactSnapshot { facts },
        }
    }

    /// A small seeded snapshot so a locally-run daemon verifies against
    /// something real-shaped.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Fact::AdmissionThreshold {
                institution: "University of the Witwatersrand".to_string(),
                programme: "Engineering".to_string(),
                aps: 42,
            },
            Fact::AdmissionThreshold {
                institution: "University of Cape Town".to_string(),
                programme: "Computer Science".to_string(),
                aps: 40,
            },
            Fact::AdmissionThreshold {
                institution: "University of Pretoria".to_string(),
                programme: "Accounting Sciences".to_string(),
                aps: 34,
            },
            Fact::BursaryDeadline {
                bursary: "Funza Lushaka".to_string(),
                deadline: NaiveDate::from_ymd_opt(2026, 1, 16).unwrap(),
            },
            Fact::BursaryDeadline {
                bursary: "NSFAS".to_string(),
                deadline: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            },
            Fact::SalaryFigure {
                occupation: "software developer".to_string(),
                annual_rand: 540_000,
            },
            Fact::SalaryFigure {
                occupation: "chartered accountant".to_string(),
                annual_rand: 650_000,
            },
        ])
    }
}

#[async_trait]
impl FactStore for StaticFactStore {
    async fn snapshot(&self) -> Result<FactSnapshot, FactStoreError> {
        Ok(self.snapshot.clone())
    }
}
