//! Shared data model for the compass guidance core.

pub mod error;
pub mod facts;
pub mod fingerprint;
pub mod guidance;
pub mod profile;
pub mod provider;
pub mod provinces;
pub mod verification;

pub use error::GuidanceError;
pub use facts::{Fact, FactSnapshot, FactStore, FactStoreError, StaticFactStore};
pub use fingerprint::Fingerprint;
pub use guidance::{
    CagBlock, ComplianceBlock, GuidanceQuery, GuidanceRequest, GuidanceResponse, ResponseSource,
};
pub use profile::{RawProfile, SanitisedProfile, Session};
pub use provider::{ChatMessage, GenerationParams, ProviderCallResult, ProviderErrorKind};
pub use provinces::{province_for_town, Province};
pub use verification::{Decision, Issue, IssueKind, Severity, StageName, VerificationReport};
