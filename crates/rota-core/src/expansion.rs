//! Occurrence expansion.
//!
//! Each item is expanded independently through a fixed decision order:
//!
//! 1. a persisted rule string plus dtstart is decompiled and enumerated;
//! 2. otherwise a recurrence phrase in the text, anchored on the first date
//!    mention, is compiled and enumerated without being stored;
//! 3. otherwise every year-explicit date inside the window is emitted, and
//! 4. every yearless date is resolved against the item's creation date, once
//!    per anniversary inside the window and no further than the resolver's
//!    cap; relative dates ("tomorrow") are emitted once;
//! 5. a deferred-to instant inside the window is always emitted as well.
//!
//! Items are expanded in parallel. The merged result is sorted by
//! `(instant, item id, item kind)` before the global cap is applied, so the
//! same inputs always truncate to the same occurrences.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::actions::{apply_actions, ActionSet};
use crate::config::EngineConfig;
use crate::dates::{DateExtractor, DateMatch, MatchTier};
use crate::identity::OccurrenceHasher;
use crate::models::{Expansion, ExpansionRequest, Item, Occurrence, OccurrenceSource, QueryWindow};
use crate::phrase::PhraseParser;
use crate::recurrence::{compile, AnchoredRule};
use crate::yearless::YearlessResolver;

/// Occurrences of a single item, already capped at `max_per_item`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemExpansion {
    pub occurrences: Vec<Occurrence>,
    /// True when the per-item cap dropped candidates.
    pub limited: bool,
    pub error: Option<String>,
}

/// Stateless engine built once from [`EngineConfig`] and reused per request.
#[derive(Debug)]
pub struct OccurrenceEngine {
    phrases: PhraseParser,
    dates: DateExtractor,
    resolver: YearlessResolver,
    hasher: OccurrenceHasher,
}

impl Default for OccurrenceEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl OccurrenceEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            phrases: PhraseParser::new(),
            dates: DateExtractor::new(config.extractor_config()),
            resolver: config.resolver(),
            hasher: OccurrenceHasher::new(config.identity),
        }
    }

    pub fn hasher(&self) -> &OccurrenceHasher {
        &self.hasher
    }

    /// Expands every item into the request window and applies both caps.
    pub fn expand(&self, items: &[Item], request: &ExpansionRequest) -> Expansion {
        let mut expansion = self.expand_uncapped(items, request);
        cap_total(&mut expansion, request.max_total);
        expansion
    }

    /// Expands, then annotates completions and ignores.
    ///
    /// Ignored occurrences are filtered before the global cap so they never
    /// use up `max_total`.
    pub fn agenda(&self, items: &[Item], actions: &ActionSet, request: &ExpansionRequest) -> Expansion {
        let mut expansion = self.expand_uncapped(items, request);
        expansion.occurrences =
            apply_actions(expansion.occurrences, actions, request.include_ignored);
        cap_total(&mut expansion, request.max_total);
        expansion
    }

    /// Runs the decision order for one item.
    ///
    /// # Arguments
    /// * `item` - Item to expand
    /// * `request` - Window, per-item cap and collapse flag
    ///
    /// # Behavior
    /// - A persisted rule wins outright; if it cannot be decompiled the item
    ///   yields no rule occurrences and the failure is reported in `error`
    /// - An inline phrase only counts when an anchor date was also found
    /// - Explicit and yearless dates are expanded independently of each other
    /// - The deferred-to instant is added regardless of the branch taken
    /// - Occurrences with equal hashes collapse into the first one
    pub fn expand_item(&self, item: &Item, request: &ExpansionRequest) -> ItemExpansion {
        let window = request.window;
        let rule_limit = if request.expand { request.max_per_item } else { 1 };
        let mut result = ItemExpansion::default();
        let mut occurrences = Vec::new();
        let mut rule_limited = false;

        if let Some((rule, dtstart)) = item.persisted_rule() {
            match AnchoredRule::decompile(rule, dtstart) {
                Ok(anchored) => {
                    rule_limited = self.push_rule(
                        item,
                        &anchored,
                        window,
                        rule_limit,
                        OccurrenceSource::PersistedRule,
                        &mut occurrences,
                    );
                }
                Err(e) => {
                    warn!(item = %item.id, error = %e, "skipping item with unreadable rule");
                    result.error = Some(format!("item {}: {}", item.id, e));
                }
            }
        } else {
            let text = item.combined_text();
            let matches = self.dates.extract_all_relative_to(&text, item.created_at);
            match self.inline_rule(item, &text, &matches) {
                Some(anchored) => {
                    rule_limited = self.push_rule(
                        item,
                        &anchored,
                        window,
                        rule_limit,
                        OccurrenceSource::InlineRule,
                        &mut occurrences,
                    );
                }
                None => self.push_dates(item, &matches, window, &mut occurrences),
            }
        }

        // A collapsed request asks for one occurrence, so the rule stopping
        // early is not truncation.
        result.limited = rule_limited && request.expand;

        if let Some(deferred) = item.deferred_until.filter(|at| window.contains(*at)) {
            occurrences.push(self.occurrence(item, deferred, None, OccurrenceSource::Deferred));
        }

        occurrences.sort_by_key(|o| o.instant);
        let mut seen = HashSet::new();
        occurrences.retain(|o| seen.insert(o.occurrence_hash.clone()));

        if occurrences.len() > request.max_per_item {
            occurrences.truncate(request.max_per_item);
            result.limited = true;
        }
        if !request.expand && occurrences.len() > 1 {
            occurrences.truncate(1);
        }

        debug!(
            item = %item.id,
            count = occurrences.len(),
            limited = result.limited,
            "expanded item"
        );
        result.occurrences = occurrences;
        result
    }

    fn expand_uncapped(&self, items: &[Item], request: &ExpansionRequest) -> Expansion {
        let parts: Vec<ItemExpansion> = items
            .par_iter()
            .map(|item| self.expand_item(item, request))
            .collect();

        let mut expansion = Expansion::default();
        for part in parts {
            expansion.truncated |= part.limited;
            expansion.errors.extend(part.error);
            expansion.occurrences.extend(part.occurrences);
        }

        expansion.occurrences.sort_by(|a, b| {
            a.instant
                .cmp(&b.instant)
                .then_with(|| a.item_id.cmp(&b.item_id))
                .then_with(|| a.item_kind.cmp(&b.item_kind))
                .then_with(|| a.occurrence_hash.cmp(&b.occurrence_hash))
        });
        expansion
    }

    fn inline_rule(&self, item: &Item, text: &str, matches: &[DateMatch]) -> Option<AnchoredRule> {
        let descriptor = self.phrases.parse(text)?;
        let anchor = matches.first()?;
        match compile(&descriptor, anchor.instant) {
            Ok(rule) => Some(rule),
            Err(e) => {
                debug!(item = %item.id, error = %e, "inline phrase did not compile");
                None
            }
        }
    }

    /// Returns whether the limit cut the rule short.
    fn push_rule(
        &self,
        item: &Item,
        rule: &AnchoredRule,
        window: QueryWindow,
        limit: usize,
        source: OccurrenceSource,
        out: &mut Vec<Occurrence>,
    ) -> bool {
        let found = rule.occurrences_between(window.start, window.end, limit);
        for instant in found.instants {
            let mut occurrence = self.occurrence(item, instant, Some(rule.rule_string()), source);
            occurrence.dtstart = Some(rule.dtstart());
            occurrence.is_recurring = true;
            out.push(occurrence);
        }
        found.limited
    }

    fn push_dates(
        &self,
        item: &Item,
        matches: &[DateMatch],
        window: QueryWindow,
        out: &mut Vec<Occurrence>,
    ) {
        for m in matches.iter().filter(|m| m.year_explicit) {
            if window.contains(m.instant) {
                out.push(self.occurrence(item, m.instant, None, OccurrenceSource::ExplicitDate));
            }
        }

        for m in matches.iter().filter(|m| !m.year_explicit) {
            // "tomorrow" or "next friday" names one day, not an anniversary.
            if m.tier == MatchTier::FreeText {
                if window.contains(m.instant) {
                    out.push(self.occurrence(item, m.instant, None, OccurrenceSource::RelativeDate));
                }
                continue;
            }
            let instants = self.resolver.resolve_in_window(
                m.month,
                m.day,
                item.created_at,
                window.start,
                window.end,
            );
            for instant in instants {
                out.push(self.occurrence(item, instant, None, OccurrenceSource::YearlessDate));
            }
        }
    }

    fn occurrence(
        &self,
        item: &Item,
        instant: DateTime<Utc>,
        rule: Option<&str>,
        source: OccurrenceSource,
    ) -> Occurrence {
        let title = item.title().to_string();
        Occurrence {
            item_kind: item.kind,
            item_id: item.id,
            instant,
            occurrence_hash: self.hasher.hash(item.kind, item.id, instant, rule, &title),
            title,
            dtstart: None,
            is_recurring: false,
            rule_string: rule.map(str::to_string),
            completed: false,
            ignored: false,
            ignore_matches: Vec::new(),
            source,
        }
    }
}

fn cap_total(expansion: &mut Expansion, max_total: usize) {
    if expansion.occurrences.len() > max_total {
        debug!(
            total = expansion.occurrences.len(),
            max_total, "truncating expansion"
        );
        expansion.occurrences.truncate(max_total);
        expansion.truncated = true;
    }
}
