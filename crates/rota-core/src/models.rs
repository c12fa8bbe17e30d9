use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::actions::IgnoreMatch;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    List,
    Task,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::List => write!(f, "list"),
            ItemKind::Task => write!(f, "task"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid item kind: {0}")]
pub struct ParseItemKindError(String);

impl FromStr for ItemKind {
    type Err = ParseItemKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "list" => Ok(ItemKind::List),
            "task" => Ok(ItemKind::Task),
            _ => Err(ParseItemKindError(s.to_string())),
        }
    }
}

/// A list or task as supplied by the surrounding application.
///
/// `rule` and `dtstart` are the persisted recurrence, if the application
/// stored one. Only both together count as a persisted rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: Uuid,
    pub kind: ItemKind,
    pub text: String,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deferred_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(default)]
    pub dtstart: Option<DateTime<Utc>>,
}

impl Item {
    pub fn new(kind: ItemKind, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            text: text.into(),
            note: None,
            created_at,
            deferred_until: None,
            rule: None,
            dtstart: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn deferred_to(mut self, instant: DateTime<Utc>) -> Self {
        self.deferred_until = Some(instant);
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>, dtstart: DateTime<Utc>) -> Self {
        self.rule = Some(rule.into());
        self.dtstart = Some(dtstart);
        self
    }

    /// Display title: the first non-empty line of the text, trimmed.
    pub fn title(&self) -> &str {
        self.text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }

    /// Text and note joined, which is what the parsers scan.
    pub fn combined_text(&self) -> String {
        match self.note.as_deref().map(str::trim) {
            Some(note) if !note.is_empty() => format!("{} {}", self.text.trim(), note),
            _ => self.text.trim().to_string(),
        }
    }

    pub fn persisted_rule(&self) -> Option<(&str, DateTime<Utc>)> {
        match (self.rule.as_deref(), self.dtstart) {
            (Some(rule), Some(dtstart)) if !rule.trim().is_empty() => Some((rule, dtstart)),
            _ => None,
        }
    }
}

/// The expansion branch that produced an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceSource {
    PersistedRule,
    InlineRule,
    ExplicitDate,
    YearlessDate,
    RelativeDate,
    Deferred,
}

impl fmt::Display for OccurrenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OccurrenceSource::PersistedRule => "persisted rule",
            OccurrenceSource::InlineRule => "inline rule",
            OccurrenceSource::ExplicitDate => "explicit date",
            OccurrenceSource::YearlessDate => "yearless date",
            OccurrenceSource::RelativeDate => "relative date",
            OccurrenceSource::Deferred => "deferred",
        };
        write!(f, "{}", name)
    }
}

/// One concrete due instant of an item. Computed per request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Occurrence {
    pub item_kind: ItemKind,
    pub item_id: Uuid,
    pub instant: DateTime<Utc>,
    pub title: String,
    pub dtstart: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub rule_string: Option<String>,
    pub occurrence_hash: String,
    pub completed: bool,
    pub ignored: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_matches: Vec<IgnoreMatch>,
    pub source: OccurrenceSource,
}

/// Inclusive UTC window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Default agenda window around `now`.
    ///
    /// # Arguments
    /// * `now` - Reference instant
    /// * `grace_days` - Days before `now` still shown, so recently missed items stay visible
    /// * `lookahead_days` - Days after `now` to expand into
    ///
    /// # Behavior
    /// - Start at `now - grace_days`, end at `now + lookahead_days`
    /// - Fall back to a one day grace if both spans are zero so the window is never empty
    /// - Clamp to the representable range instead of overflowing
    pub fn around(now: DateTime<Utc>, grace_days: u32, lookahead_days: u32) -> Self {
        let mut start = now
            .checked_sub_signed(Duration::days(grace_days as i64))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = now
            .checked_add_signed(Duration::days(lookahead_days as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if start >= end {
            start = now
                .checked_sub_signed(Duration::days(1))
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
        }
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionRequest {
    pub window: QueryWindow,
    pub max_per_item: usize,
    pub max_total: usize,
    pub include_ignored: bool,
    /// When false, each item contributes only its first occurrence.
    pub expand: bool,
}

impl ExpansionRequest {
    pub fn new(window: QueryWindow) -> Self {
        Self {
            window,
            max_per_item: 100,
            max_total: 1000,
            include_ignored: false,
            expand: true,
        }
    }

    pub fn with_caps(mut self, max_per_item: usize, max_total: usize) -> Self {
        self.max_per_item = max_per_item;
        self.max_total = max_total;
        self
    }

    pub fn including_ignored(mut self, include: bool) -> Self {
        self.include_ignored = include;
        self
    }

    pub fn expanded(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }
}

/// Result of one expansion call, sorted ascending by instant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Expansion {
    pub occurrences: Vec<Occurrence>,
    pub truncated: bool,
    /// Items skipped because their persisted rule could not be rebuilt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Expansion {
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}
