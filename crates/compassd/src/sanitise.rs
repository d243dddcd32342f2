//! PII sanitisation.
//!
//! Two directions: profiles are generalised before external use, and
//! generated text is scrubbed for any echo of the original identifiers.
//! Applied on every request; there is no debug bypass.

use compass_common::{province_for_town, RawProfile, SanitisedProfile};
use regex::{escape, RegexBuilder};
use tracing::warn;

use crate::text::split_sentences;

/// Identifiers shorter than this are too ambiguous to scan for inside
/// larger words (e.g. the surname "Le").
const MIN_PARTIAL_SCAN_LEN: usize = 4;

/// Drop identifying fields and generalise location to province level.
/// Marks, subjects and interests are not identifying in isolation for
/// this domain and pass through verbatim.
pub fn sanitise_profile(raw: &RawProfile) -> SanitisedProfile {
    let province = raw.town.as_deref().and_then(|town| {
        let found = province_for_town(town);
        if found.is_none() {
            warn!("[PII]  Town not in province table, dropping location entirely");
        }
        found
    });

    SanitisedProfile {
        province,
        marks: raw.marks.clone(),
        interests: raw.interests.clone(),
    }
}

/// Result of the output scrub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrubOutcome {
    /// No identifier found; text returned unchanged.
    Clean(String),
    /// One or more sentences removed; the remainder is certified clean.
    Scrubbed(String),
    /// A clean result cannot be certified. The caller must not return
    /// the text and must downgrade the decision to escalate.
    Ambiguous { reason: String },
}

impl ScrubOutcome {
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ScrubOutcome::Ambiguous { .. })
    }
}

/// Case-insensitive search for literal occurrences of the original name,
/// surname or school name inside generated text. A whole-word hit removes
/// the offending sentence rather than partially redacting it; an
/// identifier embedded inside a larger word cannot be safely elided and
/// makes the result ambiguous.
pub fn scrub_output(text: &str, raw: &RawProfile) -> ScrubOutcome {
    let identifiers = raw.identifiers();
    if identifiers.is_empty() {
        return ScrubOutcome::Clean(text.to_string());
    }

    let mut sentences = split_sentences(text);
    let mut removed_any = false;

    for identifier in &identifiers {
        let word_re = match RegexBuilder::new(&format!(r"\b{}\b", escape(identifier)))
            .case_insensitive(true)
            .build()
        {
            Ok(re) => re,
            Err(_) => {
                return ScrubOutcome::Ambiguous {
                    reason: "identifier not scannable".to_string(),
                }
            }
        };

        let before = sentences.len();
        sentences.retain(|sentence| !word_re.is_match(sentence));
        if sentences.len() < before {
            removed_any = true;
            warn!("[PII]  Removed {} sentence(s) echoing an identifier", before - sentences.len());
        }
    }

    let cleaned = sentences.join(" ");

    // Partial-match pass: an identifier hiding inside a larger word
    // survives the word-boundary removal above and cannot be certified.
    let lowered = cleaned.to_lowercase();
    for identifier in &identifiers {
        if identifier.len() < MIN_PARTIAL_SCAN_LEN {
            continue;
        }
        if lowered.contains(&identifier.to_lowercase()) {
            return ScrubOutcome::Ambiguous {
                reason: "identifier fragment embedded in generated text".to_string(),
            };
        }
    }

    if removed_any {
        ScrubOutcome::Scrubbed(cleaned)
    } else {
        // Nothing removed: hand back the original, not the re-joined form
        ScrubOutcome::Clean(text.to_string())
    }
}
