use chrono::{DateTime, Utc, Weekday};
use rrule::RRuleSet;
use tracing::debug;

use crate::error::CoreError;
use crate::phrase::{Frequency, RecurrenceDescriptor};

/// Encodes a descriptor as a canonical RFC 5545 rule body.
///
/// Field order is fixed (FREQ, INTERVAL, BYMONTHDAY, BYSETPOS, BYDAY) and
/// INTERVAL is always written, so equal descriptors always produce
/// byte-identical strings.
pub fn serialize(descriptor: &RecurrenceDescriptor) -> String {
    let mut parts = vec![
        format!("FREQ={}", descriptor.frequency.as_rrule()),
        format!("INTERVAL={}", descriptor.interval),
    ];
    if let Some(day) = descriptor.by_month_day {
        parts.push(format!("BYMONTHDAY={}", day));
    }
    if let Some(pos) = descriptor.by_set_position {
        parts.push(format!("BYSETPOS={}", pos));
    }
    if !descriptor.by_weekday.is_empty() {
        let days: Vec<&str> = descriptor.by_weekday.iter().map(weekday_code).collect();
        parts.push(format!("BYDAY={}", days.join(",")));
    }
    parts.join(";")
}

/// Parses a rule body written by [`serialize`] back into a descriptor.
///
/// Only the five fields `serialize` emits are understood; anything else is
/// rejected because a descriptor could not represent it.
pub fn parse_rule_string(rule: &str) -> Result<RecurrenceDescriptor, CoreError> {
    let body = rule.trim().trim_start_matches("RRULE:");
    let mut frequency = None;
    let mut interval = 1;
    let mut by_month_day = None;
    let mut by_set_position = None;
    let mut by_weekday = Vec::new();

    for part in body.split(';').filter(|p| !p.trim().is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| CoreError::InvalidRRule(format!("Malformed rule part '{}'", part)))?;
        let invalid = || CoreError::InvalidRRule(format!("Invalid value in '{}'", part));
        match key.trim().to_uppercase().as_str() {
            "FREQ" => frequency = Some(value.parse::<Frequency>().map_err(|_| invalid())?),
            "INTERVAL" => interval = value.trim().parse::<u32>().map_err(|_| invalid())?,
            "BYMONTHDAY" => by_month_day = Some(value.trim().parse::<i8>().map_err(|_| invalid())?),
            "BYSETPOS" => by_set_position = Some(value.trim().parse::<i8>().map_err(|_| invalid())?),
            "BYDAY" => {
                for code in value.split(',') {
                    by_weekday.push(weekday_from_code(code.trim()).ok_or_else(invalid)?);
                }
            }
            other => {
                return Err(CoreError::InvalidRRule(format!(
                    "Unsupported rule part '{}'",
                    other
                )))
            }
        }
    }

    let frequency =
        frequency.ok_or_else(|| CoreError::InvalidRRule(format!("Missing FREQ in '{}'", rule)))?;
    let mut descriptor = RecurrenceDescriptor::new(frequency)
        .every(interval)
        .on_weekdays(by_weekday);
    descriptor.by_month_day = by_month_day;
    descriptor.by_set_position = by_set_position;
    descriptor.validate()?;
    Ok(descriptor)
}

impl RecurrenceDescriptor {
    pub fn to_rule_string(&self) -> String {
        serialize(self)
    }

    pub fn from_rule_string(rule: &str) -> Result<Self, CoreError> {
        parse_rule_string(rule)
    }
}

/// Compiles a descriptor against an anchor instant.
///
/// # Arguments
/// * `descriptor` - Recurrence shape, usually produced by the phrase parser
/// * `dtstart` - Anchor instant (UTC)
///
/// # Returns
/// * `Result<AnchoredRule, CoreError>` - Rule bound to `dtstart`
///
/// # Behavior
/// - Reject invalid descriptors instead of building a rule that never fires
/// - Serialize to the canonical rule string, then build the enumerable rule
///   from that string so stored and live rules can never diverge
pub fn compile(descriptor: &RecurrenceDescriptor, dtstart: DateTime<Utc>) -> Result<AnchoredRule, CoreError> {
    descriptor.validate()?;
    AnchoredRule::decompile(&serialize(descriptor), dtstart)
}

/// Checks that a user-supplied rule body can be enumerated.
pub fn validate_rule_string(rule: &str) -> Result<(), CoreError> {
    AnchoredRule::decompile(rule, Utc::now()).map(|_| ())
}

/// Occurrences of a rule inside a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleWindow {
    pub instants: Vec<DateTime<Utc>>,
    /// True when the limit cut the list short.
    pub limited: bool,
}

/// A rule string bound to its anchor, plus the enumerable rule built from them.
///
/// `rule_string` and `dtstart` are the whole durable state; the live rule is
/// rebuilt from them by [`AnchoredRule::decompile`].
#[derive(Debug, Clone)]
pub struct AnchoredRule {
    dtstart: DateTime<Utc>,
    rule_string: String,
    rule: RRuleSet,
}

impl AnchoredRule {
    /// Rebuilds the enumerable rule from its stored form.
    ///
    /// # Arguments
    /// * `rule_string` - Rule body (`FREQ=...`), optionally prefixed `RRULE:`,
    ///   or a full block that already carries its own `DTSTART`
    /// * `dtstart` - Anchor instant (UTC), ignored when the block has its own
    ///
    /// # Behavior
    /// - A block's embedded `DTSTART` becomes the anchor and only its `RRULE`
    ///   body is kept, so `dtstart()` and `rule_string()` always describe what
    ///   is enumerated
    /// - Blocks with several rules, exclusions or extra dates are rejected
    pub fn decompile(rule_string: &str, dtstart: DateTime<Utc>) -> Result<Self, CoreError> {
        let body = rule_string.trim();
        if body.contains("DTSTART") {
            return Self::from_block(body);
        }

        let body = body.trim_start_matches("RRULE:").trim();
        let rule = parse_rule_set(&format!(
            "DTSTART:{}\nRRULE:{}",
            dtstart.format("%Y%m%dT%H%M%SZ"),
            body
        ))?;
        debug!(rule = %body, %dtstart, "decompiled recurrence rule");

        Ok(Self {
            dtstart,
            rule_string: body.to_string(),
            rule,
        })
    }

    fn from_block(block: &str) -> Result<Self, CoreError> {
        let set = parse_rule_set(block)?;
        let single = set.get_rrule().len() == 1
            && set.get_exrule().is_empty()
            && set.get_rdate().is_empty()
            && set.get_exdate().is_empty();
        let body = block
            .lines()
            .filter_map(|line| line.trim().strip_prefix("RRULE:"))
            .next()
            .filter(|_| single)
            .ok_or_else(|| {
                CoreError::InvalidRRule(format!("Expected exactly one RRULE in '{}'", block))
            })?;
        let anchor = set.get_dt_start().with_timezone(&Utc);
        Self::decompile(body, anchor)
    }

    pub fn dtstart(&self) -> DateTime<Utc> {
        self.dtstart
    }

    pub fn rule_string(&self) -> &str {
        &self.rule_string
    }

    /// Occurrences in the inclusive window `[start, end]`, at most `limit` of them.
    ///
    /// # Behavior
    /// - Walk the rule from its anchor, skipping instants before `start`
    /// - Stop at the first instant after `end`
    /// - Stop when `limit` instants are collected and another one is still due,
    ///   reporting that through `limited`
    pub fn occurrences_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> RuleWindow {
        let mut instants = Vec::new();
        let mut limited = false;

        for dt in &self.rule {
            let at = dt.with_timezone(&Utc);
            if at < start {
                continue;
            }
            if at > end {
                break;
            }
            if instants.len() >= limit {
                limited = true;
                break;
            }
            instants.push(at);
        }

        RuleWindow { instants, limited }
    }

    /// First occurrence strictly after `after`, or `None` if the rule has ended.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (&self.rule)
            .into_iter()
            .map(|dt| dt.with_timezone(&Utc))
            .find(|at| *at > after)
    }

    /// The next `count` occurrences at or after `from`.
    pub fn preview(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        (&self.rule)
            .into_iter()
            .map(|dt| dt.with_timezone(&Utc))
            .skip_while(|at| *at < from)
            .take(count)
            .collect()
    }
}

fn parse_rule_set(full: &str) -> Result<RRuleSet, CoreError> {
    full.parse::<RRuleSet>()
        .map_err(|e| CoreError::InvalidRRule(format!("Failed to parse RRULE '{}': {}", full, e)))
}

fn weekday_code(day: &Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code.to_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}
