//! FactCheck stage: cross-reference draft assertions against the fact
//! store snapshot.
//!
//! Extraction is deliberately narrow: admission scores, bursary
//! deadlines and salary figures, matched per sentence against known
//! entities. A claim about an entity the store does not know is left
//! alone; only contradictions of known facts become issues.

use regex::Regex;
use std::sync::LazyLock;

use compass_common::{Fact, FactSnapshot, Issue, IssueKind, Severity};

use crate::text::{mentioned_dates, rand_amounts, split_sentences};

static APS_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:aps|admission(?:\s+point)?s?(?:\s+score)?)\s*(?:of|:|is|around)?\s*(\d{1,3})")
        .unwrap()
});

/// Salary tolerance: figures within this fraction of the stored value
/// are treated as the same claim.
const SALARY_TOLERANCE: f64 = 0.10;

pub fn check(draft: &str, snapshot: &FactSnapshot) -> Vec<Issue> {
    let mut issues = Vec::new();
    let sentences = split_sentences(draft);

    for fact in &snapshot.facts {
        match fact {
            Fact::AdmissionThreshold {
                institution,
                programme,
                aps,
            } => {
                for sentence in sentences_mentioning(&sentences, institution) {
                    for caps in APS_CLAIM.captures_iter(sentence) {
                        if let Ok(cited) = caps[1].parse::<u32>() {
                            if cited != *aps {
                                issues.push(Issue::new(
                                    IssueKind::FactualMismatch,
                                    Severity::Critical,
                                    format!(
                                        "draft cites APS {} for {} ({}); records say {}",
                                        cited, institution, programme, aps
                                    ),
                                ));
                            }
                        }
                    }
                }
            }
            Fact::BursaryDeadline { bursary, deadline } => {
                for sentence in sentences_mentioning(&sentences, bursary) {
                    for mentioned in mentioned_dates(sentence) {
                        if mentioned.contradicts(*deadline) {
                            issues.push(Issue::new(
                                IssueKind::FactualMismatch,
                                Severity::Major,
                                format!(
                                    "draft gives {}-{} as the {} deadline; records say {}",
                                    mentioned.day, mentioned.month, bursary, deadline
                                ),
                            ));
                        }
                    }
                }
            }
            Fact::SalaryFigure {
                occupation,
                annual_rand,
            } => {
                for sentence in sentences_mentioning(&sentences, occupation) {
                    for cited in rand_amounts(sentence) {
                        let known = *annual_rand as f64;
                        let deviation = (cited as f64 - known).abs() / known;
                        if deviation > SALARY_TOLERANCE {
                            issues.push(Issue::new(
                                IssueKind::FactualMismatch,
                                Severity::Major,
                                format!(
                                    "draft quotes R{} for a {}; records say R{}",
                                    cited, occupation, annual_rand
                                ),
                            ));
                        }
                    }
                }
            }
        }
    }

    issues
}

fn sentences_mentioning<'a>(sentences: &'a [String], entity: &str) -> Vec<&'a str> {
    let needle = entity.to_lowercase();
    sentences
        .iter()
        .filter(|sentence| sentence.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}
