//! Anchor date extraction from free-form item text.
//!
//! Two tiers run left to right over the text:
//!
//! 1. explicit numeric and month-name substrings (`2025-09-12`, `12/9/2025`,
//!    `12 Sep`, `September 12th, 2025`, `12/9`), honouring the configured
//!    day/month order unless one number is above 12;
//! 2. a free-text search over whatever tier 1 left untouched, delegating to
//!    `chrono-english` on short word windows ("next friday", "tomorrow").
//!
//! A match is year-explicit only if its span contains a 4-digit year token.
//! Explicit-tier yearless matches get their instant from [`YearlessResolver`],
//! never from a guessed year. Free-text matches keep the single date their
//! expression names relative to the reference instant.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_english::{parse_date_string, Dialect};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::yearless::{midnight_utc, YearlessResolver};

/// How ambiguous numeric dates such as `3/4/2025` are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOrder {
    #[default]
    Dmy,
    Mdy,
}

impl DateOrder {
    fn dialect(&self) -> Dialect {
        match self {
            DateOrder::Dmy => Dialect::Uk,
            DateOrder::Mdy => Dialect::Us,
        }
    }
}

impl fmt::Display for DateOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateOrder::Dmy => write!(f, "dmy"),
            DateOrder::Mdy => write!(f, "mdy"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid date order: {0} (expected dmy or mdy)")]
pub struct ParseDateOrderError(String);

impl FromStr for DateOrder {
    type Err = ParseDateOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dmy" | "uk" => Ok(DateOrder::Dmy),
            "mdy" | "us" => Ok(DateOrder::Mdy),
            _ => Err(ParseDateOrderError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Explicit,
    FreeText,
}

/// One date mention found in text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateMatch {
    pub matched_span: String,
    pub range: Range<usize>,
    pub instant: DateTime<Utc>,
    pub year_explicit: bool,
    pub month: u32,
    pub day: u32,
    pub tier: MatchTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorConfig {
    pub order: DateOrder,
    /// Longest word window handed to the free-text tier.
    pub max_phrase_words: usize,
    pub resolver: YearlessResolver,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            order: DateOrder::Dmy,
            max_phrase_words: 4,
            resolver: YearlessResolver::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    /// year, month, day
    Iso,
    /// a, b, year with a/b ordered by config
    NumericWithYear,
    /// day, month name, optional year
    DayMonthName,
    /// month name, day, optional year
    MonthNameDay,
    /// a, b ordered by config, no year
    NumericShort,
}

struct ExplicitPattern {
    shape: Shape,
    regex: Regex,
}

const MONTH: &str = r"(january|jan|february|feb|march|mar|april|apr|may|june|jun|july|jul|august|aug|september|sept|sep|october|oct|november|nov|december|dec)";

/// Words that never anchor a date on their own: generic "now"-like anchors and
/// number words that fuzzy date parsers tend to read as months or days.
const REJECTED_WORDS: &[&str] = &[
    "today", "now", "tonight", "one", "two", "three", "four", "five", "six", "seven", "eight",
    "nine", "ten", "eleven", "twelve",
];

/// Words that must appear in a free-text window before it is worth parsing.
/// Month names are left to the explicit tier; "sat", "sun" and "wed" are
/// ordinary English words and only count when spelled out. Past-only words
/// such as "yesterday" never name a due date.
const DATE_WORDS: &[&str] = &[
    "tomorrow", "monday", "mon", "tuesday", "tue", "tues", "wednesday",
    "thursday", "thu", "thur", "thurs", "friday", "fri", "saturday", "sunday",
];

/// Immutable extractor configured once and shared across calls.
pub struct DateExtractor {
    config: ExtractorConfig,
    explicit: Vec<ExplicitPattern>,
    word: Regex,
    year_token: Regex,
}

impl fmt::Debug for DateExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DateExtractor").field("config", &self.config).finish()
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl DateExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let rows = [
            (Shape::Iso, r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b".to_string()),
            (
                Shape::NumericWithYear,
                r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})\b".to_string(),
            ),
            (
                Shape::DayMonthName,
                format!(r"\b(\d{{1,2}})(?:st|nd|rd|th)?(?:\s+of)?\s+{MONTH}\.?(?:,?\s+(\d{{4}}))?\b"),
            ),
            (
                Shape::MonthNameDay,
                format!(r"\b{MONTH}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?(?:,?\s+(\d{{4}}))?\b"),
            ),
            (Shape::NumericShort, r"\b(\d{1,2})/(\d{1,2})\b".to_string()),
        ];

        let explicit = rows
            .into_iter()
            .map(|(shape, pattern)| ExplicitPattern {
                shape,
                regex: Regex::new(&format!("(?i){}", pattern))
                    .expect("date patterns are valid regular expressions"),
            })
            .collect();

        Self {
            config,
            explicit,
            word: Regex::new(r"[A-Za-z0-9]+").expect("word pattern is valid"),
            year_token: Regex::new(r"\b\d{4}\b").expect("year pattern is valid"),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts every date mention, relative expressions measured from now.
    pub fn extract_all(&self, text: &str) -> Vec<DateMatch> {
        self.extract_all_relative_to(text, Utc::now())
    }

    /// Extracts every date mention in left-to-right order. `reference` anchors
    /// relative expressions and yearless resolution.
    pub fn extract_all_relative_to(&self, text: &str, reference: DateTime<Utc>) -> Vec<DateMatch> {
        let (mut matches, claimed) = self.explicit_matches(text, reference);
        matches.extend(self.free_text_matches(text, &claimed, reference));
        matches.sort_by_key(|m| m.range.start);
        matches
    }

    /// Returns the matches plus every span a pattern claimed, including spans
    /// that named an impossible calendar date. Claimed spans are not searched
    /// again by lower-priority shapes or by the free-text tier.
    fn explicit_matches(
        &self,
        text: &str,
        reference: DateTime<Utc>,
    ) -> (Vec<DateMatch>, Vec<Range<usize>>) {
        let mut found: Vec<DateMatch> = Vec::new();
        let mut claimed: Vec<Range<usize>> = Vec::new();
        for pattern in &self.explicit {
            for caps in pattern.regex.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                let range = whole.range();
                if claimed.iter().any(|c| overlaps(c, &range)) {
                    continue;
                }
                let Some((year, month, day)) = self.fields(pattern.shape, &caps) else {
                    continue;
                };
                claimed.push(range.clone());
                if let Some(found_match) =
                    self.build_match(text, range, year, month, day, MatchTier::Explicit, reference)
                {
                    found.push(found_match);
                }
            }
        }
        (found, claimed)
    }

    fn fields(&self, shape: Shape, caps: &Captures<'_>) -> Option<(Option<i32>, u32, u32)> {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let year = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i32>().ok());
        match shape {
            Shape::Iso => Some((year(1), num(2)?, num(3)?)),
            Shape::NumericWithYear => {
                let (month, day) = order_numeric(num(1)?, num(2)?, self.config.order)?;
                Some((year(3), month, day))
            }
            Shape::DayMonthName => {
                let month = month_from_name(caps.get(2)?.as_str())?;
                Some((year(3), month, num(1)?))
            }
            Shape::MonthNameDay => {
                let month = month_from_name(caps.get(1)?.as_str())?;
                Some((year(3), month, num(2)?))
            }
            Shape::NumericShort => {
                let (month, day) = order_numeric(num(1)?, num(2)?, self.config.order)?;
                Some((None, month, day))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_match(
        &self,
        text: &str,
        range: Range<usize>,
        year: Option<i32>,
        month: u32,
        day: u32,
        tier: MatchTier,
        reference: DateTime<Utc>,
    ) -> Option<DateMatch> {
        let span = &text[range.clone()];
        let year_explicit = self.year_token.is_match(span);
        let instant = match year {
            Some(year) if year_explicit || tier == MatchTier::FreeText => {
                midnight_utc(NaiveDate::from_ymd_opt(year, month, day)?)
            }
            _ => {
                // Plausibility against a leap year, then the resolver picks the year.
                NaiveDate::from_ymd_opt(2000, month, day)?;
                self.config.resolver.resolve(month, day, reference)?
            }
        };
        Some(DateMatch {
            matched_span: span.to_string(),
            range,
            instant,
            year_explicit,
            month,
            day,
            tier,
        })
    }

    fn free_text_matches(
        &self,
        text: &str,
        taken: &[Range<usize>],
        reference: DateTime<Utc>,
    ) -> Vec<DateMatch> {
        // Words inside a tier-1 span act as barriers: windows never cross them.
        let mut segments: Vec<Vec<Range<usize>>> = vec![Vec::new()];
        for word in self.word.find_iter(text) {
            let range = word.range();
            if taken.iter().any(|t| overlaps(t, &range)) {
                if segments.last().map_or(false, |s| !s.is_empty()) {
                    segments.push(Vec::new());
                }
                continue;
            }
            if let Some(segment) = segments.last_mut() {
                segment.push(range);
            }
        }

        let mut found = Vec::new();
        let max_words = self.config.max_phrase_words.max(1);
        for words in &segments {
            let mut i = 0;
            while i < words.len() {
                let longest = max_words.min(words.len() - i);
                let hit = (1..=longest).rev().find_map(|len| {
                    let window = &words[i..i + len];
                    let range = window[0].start..window[len - 1].end;
                    let candidate = &text[range.clone()];
                    if !is_free_text_candidate(candidate) {
                        return None;
                    }
                    let parsed =
                        parse_date_string(candidate, reference, self.config.order.dialect()).ok()?;
                    let date = parsed.date_naive();
                    let year = Some(date.year());
                    self.build_match(
                        text,
                        range,
                        year,
                        date.month(),
                        date.day(),
                        MatchTier::FreeText,
                        reference,
                    )
                    .map(|m| (len, m))
                });
                match hit {
                    Some((len, m)) => {
                        found.push(m);
                        i += len;
                    }
                    None => i += 1,
                }
            }
        }
        found
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn is_free_text_candidate(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.iter().any(|w| REJECTED_WORDS.contains(w)) {
        return false;
    }
    words.iter().any(|w| DATE_WORDS.contains(w))
}

/// Orders two numeric date parts. A part above 12 can only be the day, which
/// overrides the configured order.
fn order_numeric(a: u32, b: u32, order: DateOrder) -> Option<(u32, u32)> {
    match (a > 12, b > 12) {
        (true, true) => None,
        (true, false) => Some((b, a)),
        (false, true) => Some((a, b)),
        (false, false) => match order {
            DateOrder::Dmy => Some((b, a)),
            DateOrder::Mdy => Some((a, b)),
        },
    }
}

/// Month number for an English month name or abbreviation.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.trim_end_matches('.').to_lowercase();
    let month = match lower.as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}
