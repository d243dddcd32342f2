//! Student profile and consent session types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::provinces::Province;

/// Consent state captured upstream at registration. Read-only here;
/// a request with `consent_given = false` never reaches a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub consent_given: bool,
    #[serde(default)]
    pub consent_timestamp: Option<DateTime<Utc>>,
}

impl Session {
    pub fn consented(timestamp: DateTime<Utc>) -> Self {
        Self {
            consent_given: true,
            consent_timestamp: Some(timestamp),
        }
    }

    pub fn withheld() -> Self {
        Self {
            consent_given: false,
            consent_timestamp: None,
        }
    }
}

/// Free-form profile as supplied by the caller.
///
/// Owned by the caller and dies with the request: never persisted, never
/// cached keyed by identity, never serialised toward a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub school_name: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    /// Subject name to percentage mark. BTreeMap keeps iteration order
    /// canonical for fingerprinting.
    #[serde(default)]
    pub marks: BTreeMap<String, u8>,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl RawProfile {
    /// The literal identifiers that must never appear in generated text.
    pub fn identifiers(&self) -> Vec<&str> {
        [&self.name, &self.surname, &self.school_name]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Generalised, de-identified view of a profile. The only profile shape
/// that may cross the provider boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanitisedProfile {
    #[serde(default)]
    pub province: Option<Province>,
    #[serde(default)]
    pub marks: BTreeMap<String, u8>,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl SanitisedProfile {
    /// Render the profile for prompt context. Contains no identifiers.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(province) = self.province {
            parts.push(format!("Province: {}", province));
        }
        if !self.marks.is_empty() {
            let marks: Vec<String> = self
                .marks
                .iter()
                .map(|(subject, score)| format!("{} {}%", subject, score))
                .collect();
            parts.push(format!("Marks: {}", marks.join(", ")));
        }
        if !self.interests.is_empty() {
            parts.push(format!("Interests: {}", self.interests.join(", ")));
        }
        if parts.is_empty() {
            "No academic details supplied.".to_string()
        } else {
            parts.join("\n")
        }
    }
}
