//! Recurrence phrase parser.
//!
//! Recognises a closed set of short English recurrence phrases ("every 2 weeks",
//! "the last friday of every month", ...) and turns the first one found into a
//! [`RecurrenceDescriptor`]. The grammar is an ordered table of
//! `(pattern, builder)` pairs: patterns are tried in table order and the first
//! one whose builder accepts the match wins. New phrasings are added as new
//! rows, never as fuzzy scoring.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::Weekday;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// The RFC 5545 `FREQ` value.
    pub fn as_rrule(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }

    fn from_unit(unit: &str) -> Option<Self> {
        match unit.to_lowercase().as_str() {
            "day" | "days" | "daily" => Some(Frequency::Daily),
            "week" | "weeks" | "weekly" => Some(Frequency::Weekly),
            "month" | "months" | "monthly" => Some(Frequency::Monthly),
            "year" | "years" | "yearly" | "annually" => Some(Frequency::Yearly),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid frequency: {0}")]
pub struct ParseFrequencyError(String);

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}

/// Tagged description of a recurrence, as produced by [`PhraseParser`].
///
/// `by_set_position` only makes sense together with a non-empty `by_weekday`,
/// and `by_month_day` excludes the weekday/set-position encoding. Use
/// [`RecurrenceDescriptor::validate`] before handing a hand-built value to the
/// rule compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceDescriptor {
    pub frequency: Frequency,
    pub interval: u32,
    /// Ordered Monday..Sunday, no duplicates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_weekday: Vec<Weekday>,
    /// 1..=5, or -1 for "last".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_set_position: Option<i8>,
    /// 1..=31, or -1 for "last day".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_month_day: Option<i8>,
}

impl RecurrenceDescriptor {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            by_weekday: Vec::new(),
            by_set_position: None,
            by_month_day: None,
        }
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn on_weekdays<I: IntoIterator<Item = Weekday>>(mut self, days: I) -> Self {
        let mut days: Vec<Weekday> = days.into_iter().collect();
        days.sort_by_key(|d| d.num_days_from_monday());
        days.dedup();
        self.by_weekday = days;
        self
    }

    pub fn at_set_position(mut self, position: i8) -> Self {
        self.by_set_position = Some(position);
        self
    }

    pub fn on_month_day(mut self, day: i8) -> Self {
        self.by_month_day = Some(day);
        self
    }

    /// Rejects combinations that would compile to a rule that never fires or
    /// that mixes the two day-selection encodings.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.interval == 0 {
            return Err(CoreError::InvalidDescriptor(
                "interval must be at least 1".to_string(),
            ));
        }
        if let Some(pos) = self.by_set_position {
            if self.by_weekday.is_empty() {
                return Err(CoreError::InvalidDescriptor(
                    "set position requires at least one weekday".to_string(),
                ));
            }
            if !(pos == -1 || (1..=5).contains(&pos)) {
                return Err(CoreError::InvalidDescriptor(format!(
                    "set position {} is outside 1..=5 and is not -1",
                    pos
                )));
            }
        }
        if let Some(day) = self.by_month_day {
            if self.by_set_position.is_some() || !self.by_weekday.is_empty() {
                return Err(CoreError::InvalidDescriptor(
                    "month day cannot be combined with weekday selection".to_string(),
                ));
            }
            if !(day == -1 || (1..=31).contains(&day)) {
                return Err(CoreError::InvalidDescriptor(format!(
                    "month day {} is outside 1..=31 and is not -1",
                    day
                )));
            }
        }
        Ok(())
    }
}

/// A successful phrase match: the descriptor plus where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseMatch {
    pub descriptor: RecurrenceDescriptor,
    /// Name of the grammar row that fired.
    pub pattern: &'static str,
    pub matched_span: String,
    pub range: Range<usize>,
}

type Builder = fn(&Captures<'_>) -> Option<RecurrenceDescriptor>;

struct PhrasePattern {
    name: &'static str,
    regex: Regex,
    build: Builder,
}

const UNIT: &str = r"(day|week|month|year)";
const ORDINAL: &str = r"(\d{1,2}(?:st|nd|rd|th)|first|second|third|fourth|fifth)";
const WEEKDAY: &str = r"(?:monday|mon|tuesday|tues|tue|wednesday|wed|thursday|thurs|thur|thu|friday|fri|saturday|sat|sunday|sun)";
const PERIOD_MONTH: &str = r"of\s+(?:every|each|the)\s+month";

/// Immutable, explicitly constructed phrase grammar.
pub struct PhraseParser {
    patterns: Vec<PhrasePattern>,
}

impl fmt::Debug for PhraseParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhraseParser")
            .field("patterns", &self.pattern_names().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for PhraseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseParser {
    /// Compiles the grammar. Rows are listed highest priority first.
    pub fn new() -> Self {
        let rows: Vec<(&'static str, String, Builder)> = vec![
            (
                "every_n_units",
                format!(r"\bevery\s+(\d{{1,3}})\s+{UNIT}s?\b"),
                build_every_n_units,
            ),
            (
                "every_other_unit",
                format!(r"\bevery\s+other\s+{UNIT}\b"),
                build_every_other_unit,
            ),
            (
                "recurring_keyword",
                r"\brecurring\s+(daily|weekly|monthly|yearly|annually)\b".to_string(),
                build_recurring_keyword,
            ),
            (
                "every_nth_month",
                format!(r"\bevery\s+{ORDINAL}\s+month\b"),
                build_every_nth_month,
            ),
            (
                "nth_weekday_of_month",
                format!(r"\b(?:the|every)\s+{ORDINAL}\s+({WEEKDAY})s?\s+{PERIOD_MONTH}\b"),
                build_nth_weekday_of_month,
            ),
            (
                "last_weekday_of_month",
                format!(r"\b(?:(?:the|every)\s+)?last\s+({WEEKDAY})s?\s+{PERIOD_MONTH}\b"),
                build_last_weekday_of_month,
            ),
            (
                "last_day_of_month",
                format!(r"\b(?:the\s+)?last\s+day\s+{PERIOD_MONTH}\b"),
                build_last_day_of_month,
            ),
            (
                "month_on_the_nth",
                r"\bevery\s+month\s+on\s+the\s+(\d{1,2})(?:st|nd|rd|th)?\b".to_string(),
                build_month_on_the_nth,
            ),
            (
                "every_nth_weekday",
                format!(r"\bevery\s+{ORDINAL}\s+({WEEKDAY})\b"),
                build_every_nth_weekday,
            ),
            (
                "every_weekday",
                r"\bevery\s+weekdays?\b".to_string(),
                build_every_weekday,
            ),
            (
                "named_weekdays",
                format!(
                    r"\b(?:every|on)\s+({WEEKDAY}s?(?:\s*(?:,\s*and|,|and|&)\s*{WEEKDAY}s?)*)\b"
                ),
                build_named_weekdays,
            ),
            (
                "every_unit",
                format!(r"\bevery\s+{UNIT}\b"),
                build_every_unit,
            ),
        ];

        let patterns = rows
            .into_iter()
            .map(|(name, pattern, build)| PhrasePattern {
                name,
                regex: Regex::new(&format!("(?i){}", pattern))
                    .expect("recurrence grammar patterns are valid regular expressions"),
                build,
            })
            .collect();

        Self { patterns }
    }

    /// Grammar rows in priority order.
    pub fn pattern_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.patterns.iter().map(|p| p.name)
    }

    pub fn parse(&self, text: &str) -> Option<RecurrenceDescriptor> {
        self.find(text).map(|m| m.descriptor)
    }

    /// Like [`parse`](Self::parse) but also reports the span and the row that fired.
    pub fn find(&self, text: &str) -> Option<PhraseMatch> {
        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(text) {
                if let Some(descriptor) = (pattern.build)(&caps) {
                    let whole = caps.get(0)?;
                    return Some(PhraseMatch {
                        descriptor,
                        pattern: pattern.name,
                        matched_span: whole.as_str().to_string(),
                        range: whole.range(),
                    });
                }
            }
        }
        None
    }
}

/// Parses with a freshly built grammar. Prefer holding a [`PhraseParser`]
/// when parsing many strings.
pub fn parse(text: &str) -> Option<RecurrenceDescriptor> {
    PhraseParser::new().parse(text)
}

fn ordinal_value(token: &str) -> Option<u32> {
    let lower = token.to_lowercase();
    match lower.as_str() {
        "first" => Some(1),
        "second" => Some(2),
        "third" => Some(3),
        "fourth" => Some(4),
        "fifth" => Some(5),
        _ => {
            let digits: String = lower.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
    }
}

/// Maps an English weekday name or common abbreviation (optionally plural) to a [`Weekday`].
pub fn weekday_from_name(name: &str) -> Option<Weekday> {
    let lower = name.trim().to_lowercase();
    let lookup = |s: &str| match s {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tues" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thurs" | "thur" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    };
    lookup(&lower).or_else(|| lower.strip_suffix('s').and_then(lookup))
}

fn capture<'t>(caps: &Captures<'t>, index: usize) -> Option<&'t str> {
    caps.get(index).map(|m| m.as_str())
}

fn build_every_n_units(caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    let interval: u32 = capture(caps, 1)?.parse().ok()?;
    if interval == 0 {
        return None;
    }
    let frequency = Frequency::from_unit(capture(caps, 2)?)?;
    Some(RecurrenceDescriptor::new(frequency).every(interval))
}

fn build_every_other_unit(caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    let frequency = Frequency::from_unit(capture(caps, 1)?)?;
    Some(RecurrenceDescriptor::new(frequency).every(2))
}

fn build_recurring_keyword(caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    Frequency::from_unit(capture(caps, 1)?).map(RecurrenceDescriptor::new)
}

fn build_every_nth_month(caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    let interval = ordinal_value(capture(caps, 1)?)?;
    if interval == 0 {
        return None;
    }
    Some(RecurrenceDescriptor::new(Frequency::Monthly).every(interval))
}

fn build_nth_weekday_of_month(caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    let position = ordinal_value(capture(caps, 1)?)?;
    if !(1..=5).contains(&position) {
        return None;
    }
    let weekday = weekday_from_name(capture(caps, 2)?)?;
    Some(
        RecurrenceDescriptor::new(Frequency::Monthly)
            .on_weekdays([weekday])
            .at_set_position(position as i8),
    )
}

fn build_last_weekday_of_month(caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    let weekday = weekday_from_name(capture(caps, 1)?)?;
    Some(
        RecurrenceDescriptor::new(Frequency::Monthly)
            .on_weekdays([weekday])
            .at_set_position(-1),
    )
}

fn build_last_day_of_month(_caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    Some(RecurrenceDescriptor::new(Frequency::Monthly).on_month_day(-1))
}

fn build_month_on_the_nth(caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    let day: i8 = capture(caps, 1)?.parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }
    Some(RecurrenceDescriptor::new(Frequency::Monthly).on_month_day(day))
}

fn build_every_nth_weekday(caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    let interval = ordinal_value(capture(caps, 1)?)?;
    if interval == 0 {
        return None;
    }
    let weekday = weekday_from_name(capture(caps, 2)?)?;
    Some(
        RecurrenceDescriptor::new(Frequency::Weekly)
            .every(interval)
            .on_weekdays([weekday]),
    )
}

fn build_every_weekday(_caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    Some(RecurrenceDescriptor::new(Frequency::Weekly).on_weekdays([
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]))
}

fn build_named_weekdays(caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    let list = capture(caps, 1)?;
    let days: Vec<Weekday> = list
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
        .filter_map(weekday_from_name)
        .collect();
    if days.is_empty() {
        return None;
    }
    Some(RecurrenceDescriptor::new(Frequency::Weekly).on_weekdays(days))
}

fn build_every_unit(caps: &Captures<'_>) -> Option<RecurrenceDescriptor> {
    Frequency::from_unit(capture(caps, 1)?).map(RecurrenceDescriptor::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn weekly_on(days: &[Weekday]) -> RecurrenceDescriptor {
        RecurrenceDescriptor::new(Frequency::Weekly).on_weekdays(days.iter().copied())
    }

    #[rstest]
    #[case("water plants every 3 days", RecurrenceDescriptor::new(Frequency::Daily).every(3))]
    #[case("review every 2 weeks", RecurrenceDescriptor::new(Frequency::Weekly).every(2))]
    #[case("Every 1 Month", RecurrenceDescriptor::new(Frequency::Monthly))]
    #[case("every 5 years", RecurrenceDescriptor::new(Frequency::Yearly).every(5))]
    #[case("every other week", RecurrenceDescriptor::new(Frequency::Weekly).every(2))]
    #[case("recurring monthly", RecurrenceDescriptor::new(Frequency::Monthly))]
    #[case("recurring annually", RecurrenceDescriptor::new(Frequency::Yearly))]
    #[case("every 3rd month", RecurrenceDescriptor::new(Frequency::Monthly).every(3))]
    #[case("every second month", RecurrenceDescriptor::new(Frequency::Monthly).every(2))]
    #[case("every 2nd friday", weekly_on(&[Weekday::Fri]).every(2))]
    #[case("every weekday", weekly_on(&[Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]))]
    #[case("every monday", weekly_on(&[Weekday::Mon]))]
    #[case("gym on tuesdays", weekly_on(&[Weekday::Tue]))]
    #[case("every thu and mon", weekly_on(&[Weekday::Mon, Weekday::Thu]))]
    #[case("on sat, sun", weekly_on(&[Weekday::Sat, Weekday::Sun]))]
    #[case(
        "the 2nd sunday of every month",
        RecurrenceDescriptor::new(Frequency::Monthly).on_weekdays([Weekday::Sun]).at_set_position(2)
    )]
    #[case(
        "every first monday of the month",
        RecurrenceDescriptor::new(Frequency::Monthly).on_weekdays([Weekday::Mon]).at_set_position(1)
    )]
    #[case(
        "the last friday of every month",
        RecurrenceDescriptor::new(Frequency::Monthly).on_weekdays([Weekday::Fri]).at_set_position(-1)
    )]
    #[case("pay rent last day of every month", RecurrenceDescriptor::new(Frequency::Monthly).on_month_day(-1))]
    #[case("every month on the 15th", RecurrenceDescriptor::new(Frequency::Monthly).on_month_day(15))]
    #[case("every day", RecurrenceDescriptor::new(Frequency::Daily))]
    #[case("every year", RecurrenceDescriptor::new(Frequency::Yearly))]
    fn test_phrase_grammar(#[case] text: &str, #[case] expected: RecurrenceDescriptor) {
        let parser = PhraseParser::new();
        assert_eq!(parser.parse(text), Some(expected));
    }

    #[rstest]
    #[case("buy milk")]
    #[case("every 0 days")]
    #[case("every fortnight")]
    #[case("someday maybe on the weekend")]
    #[case("")]
    fn test_no_match(#[case] text: &str) {
        assert_eq!(PhraseParser::new().parse(text), None);
    }

    #[test]
    fn test_priority_order_is_explicit() {
        let parser = PhraseParser::new();
        let names: Vec<_> = parser.pattern_names().collect();
        assert_eq!(names.first(), Some(&"every_n_units"));
        let nth_of_month = names.iter().position(|n| *n == "nth_weekday_of_month").unwrap();
        let nth_weekday = names.iter().position(|n| *n == "every_nth_weekday").unwrap();
        assert!(nth_of_month < nth_weekday);
        assert_eq!(names.last(), Some(&"every_unit"));
    }

    #[test]
    fn test_monthly_set_position_beats_weekly_interval() {
        let parser = PhraseParser::new();
        let found = parser.find("every 2nd tuesday of every month").unwrap();
        assert_eq!(found.pattern, "nth_weekday_of_month");
        assert_eq!(found.descriptor.frequency, Frequency::Monthly);
        assert_eq!(found.descriptor.by_set_position, Some(2));
    }

    #[test]
    fn test_find_reports_span() {
        let parser = PhraseParser::new();
        let text = "Team sync every 2 weeks from Sep 1";
        let found = parser.find(text).unwrap();
        assert_eq!(found.matched_span, "every 2 weeks");
        assert_eq!(&text[found.range.clone()], "every 2 weeks");
    }

    #[test]
    fn test_parser_only_emits_valid_descriptors() {
        let parser = PhraseParser::new();
        for text in [
            "every 4 days",
            "the last sunday of each month",
            "last day of the month",
            "every month on the 31st",
            "every weekday",
        ] {
            let descriptor = parser.parse(text).unwrap();
            assert!(descriptor.validate().is_ok(), "{} produced invalid descriptor", text);
        }
    }

    mod descriptor_tests {
        use super::*;

        #[test]
        fn test_validate_rejects_set_position_without_weekday() {
            let descriptor = RecurrenceDescriptor::new(Frequency::Monthly).at_set_position(2);
            assert!(matches!(descriptor.validate(), Err(CoreError::InvalidDescriptor(_))));
        }

        #[test]
        fn test_validate_rejects_mixed_day_selection() {
            let descriptor = RecurrenceDescriptor::new(Frequency::Monthly)
                .on_weekdays([Weekday::Mon])
                .on_month_day(3);
            assert!(descriptor.validate().is_err());
        }

        #[test]
        fn test_validate_rejects_zero_interval() {
            let descriptor = RecurrenceDescriptor::new(Frequency::Daily).every(0);
            assert!(descriptor.validate().is_err());
        }

        #[test]
        fn test_weekdays_are_ordered_and_deduplicated() {
            let descriptor = RecurrenceDescriptor::new(Frequency::Weekly)
                .on_weekdays([Weekday::Fri, Weekday::Mon, Weekday::Fri]);
            assert_eq!(descriptor.by_weekday, vec![Weekday::Mon, Weekday::Fri]);
        }

        #[test]
        fn test_frequency_from_str() {
            assert_eq!("weekly".parse::<Frequency>(), Ok(Frequency::Weekly));
            assert!("fortnightly".parse::<Frequency>().is_err());
        }
    }
}
