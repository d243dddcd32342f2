//! Small text helpers shared by the sanitiser and the verification
//! stages. All deterministic; no locale handling beyond English month
//! names, which is what the drafts use.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// Split text into sentences, keeping terminators attached.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

static RAND_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"R\s?([0-9][0-9\s,.]*[0-9]|[0-9])").unwrap());

/// Extract rand amounts ("R540 000", "R540,000", "R540000") as integers.
pub fn rand_amounts(text: &str) -> Vec<u64> {
    RAND_AMOUNT
        .captures_iter(text)
        .filter_map(|caps| {
            let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        })
        .collect()
}

static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s+(january|february|march|april|may|june|july|august|september|october|november|december)(?:\s+(\d{4}))?",
    )
    .unwrap()
});

/// A calendar date extracted from prose; the year is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MentionedDate {
    pub day: u32,
    pub month: u32,
    pub year: Option<i32>,
}

impl MentionedDate {
    /// Whether this mention contradicts a known date. A missing year
    /// matches any year; day and month must agree.
    pub fn contradicts(&self, known: NaiveDate) -> bool {
        if self.day != known.day() || self.month != known.month() {
            return true;
        }
        matches!(self.year, Some(year) if year != known.year())
    }
}

fn month_number(name: &str) -> u32 {
    match name.to_lowercase().as_str() {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        _ => 12,
    }
}

/// Extract "30 September" / "16 January 2026" style dates.
pub fn mentioned_dates(text: &str) -> Vec<MentionedDate> {
    DAY_MONTH
        .captures_iter(text)
        .filter_map(|caps| {
            let day: u32 = caps[1].parse().ok()?;
            if !(1..=31).contains(&day) {
                return None;
            }
            Some(MentionedDate {
                day,
                month: month_number(&caps[2]),
                year: caps.get(3).and_then(|m| m.as_str().parse().ok()),
            })
        })
        .collect()
}
