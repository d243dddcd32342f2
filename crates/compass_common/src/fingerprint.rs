//! Stable request fingerprints for response caching.
//!
//! Two requests with the same normalised query, sanitised profile and
//! generation parameters must collide; the correction field is excluded
//! because revisions are internal to a single generation.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::guidance::GuidanceRequest;

/// Hex-encoded SHA-256 over the canonical request form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(request: &GuidanceRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalise_query(&request.query).as_bytes());
        hasher.update([0x1f]);

        if let Some(province) = request.profile.province {
            hasher.update(province.name().as_bytes());
        }
        hasher.update([0x1f]);

        // BTreeMap iteration keeps subject order canonical
        for (subject, score) in &request.profile.marks {
            hasher.update(subject.to_lowercase().as_bytes());
            hasher.update([b'=', *score, 0x1e]);
        }
        hasher.update([0x1f]);

        for interest in &request.profile.interests {
            hasher.update(interest.trim().to_lowercase().as_bytes());
            hasher.update([0x1e]);
        }
        hasher.update([0x1f]);

        hasher.update(request.params.max_tokens.to_le_bytes());
        hasher.update(request.params.temperature.to_le_bytes());

        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for logs.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// Trim, lowercase, and collapse internal whitespace runs. No stemming.
pub fn normalise_query(query: &str) -> String {
    query
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
