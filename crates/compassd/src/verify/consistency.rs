//! ConsistencyCheck stage: the draft must not contradict the sanitised
//! profile it was generated from.
//!
//! Signals are concrete, not vibes: a claim about "your mark" in a
//! subject the profile does not carry, or "your interest" in something
//! the student never stated.

use regex::Regex;
use std::sync::LazyLock;

use compass_common::{Issue, IssueKind, SanitisedProfile, Severity};

static MARK_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)your\s+(?:marks?|results?|performance)\s+in\s+([A-Za-z][A-Za-z ]{2,30}?)(?:\s+(?:is|are|was|were|show|shows|suggest|suggests|make|makes|mean|means)\b|[,.;:!?])")
        .unwrap()
});

static STRENGTH_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)strong\s+(?:marks?|results?|performance)\s+in\s+([A-Za-z][A-Za-z ]{2,30}?)(?:\s+(?:is|are|was|were|show|shows|suggest|suggests|make|makes|mean|means)\b|[,.;:!?])")
        .unwrap()
});

static INTEREST_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)your\s+interest\s+in\s+([A-Za-z][A-Za-z ]{2,30}?)(?:\s+(?:is|are|was|were|show|shows|suggest|suggests|make|makes|mean|means)\b|[,.;:!?])")
        .unwrap()
});

pub fn check(draft: &str, profile: &SanitisedProfile) -> Vec<Issue> {
    let mut issues = Vec::new();

    for regex in [&*MARK_CLAIM, &*STRENGTH_CLAIM] {
        for caps in regex.captures_iter(draft) {
            let subject = caps[1].trim();
            if !has_subject(profile, subject) {
                issues.push(Issue::new(
                    IssueKind::ProfileInconsistency,
                    Severity::Major,
                    format!("draft refers to a mark in '{}' that the profile does not contain", subject),
                ));
            }
        }
    }

    for caps in INTEREST_CLAIM.captures_iter(draft) {
        let interest = caps[1].trim();
        if !has_interest(profile, interest) {
            issues.push(Issue::new(
                IssueKind::ProfileInconsistency,
                Severity::Minor,
                format!("draft refers to an interest in '{}' that the student never stated", interest),
            ));
        }
    }

    issues
}

fn has_subject(profile: &SanitisedProfile, subject: &str) -> bool {
    let needle = subject.to_lowercase();
    profile
        .marks
        .keys()
        .any(|known| known.to_lowercase() == needle)
}

fn has_interest(profile: &SanitisedProfile, interest: &str) -> bool {
    let needle = interest.to_lowercase();
    profile
        .interests
        .iter()
        .any(|known| known.to_lowercase().contains(&needle) || needle.contains(&known.to_lowercase()))
}
