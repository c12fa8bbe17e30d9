//! Completion and ignore annotations.
//!
//! The surrounding application owns these records; the engine only reads
//! them. Completions are keyed by occurrence hash. Ignores are keyed by a
//! scope: one occurrence (by hash), a whole list (by item id), or one task
//! from an instant onward (by item id plus `from_instant`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{ItemKind, Occurrence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    Occurrence,
    List,
    TodoFrom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreScope {
    pub scope_type: ScopeType,
    pub scope_key: String,
    #[serde(default)]
    pub from_instant: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl IgnoreScope {
    pub fn occurrence(hash: impl Into<String>) -> Self {
        Self {
            scope_type: ScopeType::Occurrence,
            scope_key: hash.into(),
            from_instant: None,
            active: true,
        }
    }

    pub fn list(id: Uuid) -> Self {
        Self {
            scope_type: ScopeType::List,
            scope_key: id.to_string(),
            from_instant: None,
            active: true,
        }
    }

    pub fn task_from(id: Uuid, from: DateTime<Utc>) -> Self {
        Self {
            scope_type: ScopeType::TodoFrom,
            scope_key: id.to_string(),
            from_instant: Some(from),
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    fn key_is(&self, id: Uuid) -> bool {
        self.scope_key.trim().eq_ignore_ascii_case(&id.to_string())
    }

    pub fn matches(&self, occurrence: &Occurrence) -> bool {
        if !self.active {
            return false;
        }
        match self.scope_type {
            ScopeType::Occurrence => self.scope_key.trim() == occurrence.occurrence_hash,
            ScopeType::List => occurrence.item_kind == ItemKind::List && self.key_is(occurrence.item_id),
            ScopeType::TodoFrom => {
                occurrence.item_kind == ItemKind::Task
                    && self.key_is(occurrence.item_id)
                    && self.from_instant.map_or(true, |from| occurrence.instant >= from)
            }
        }
    }
}

/// Which scope suppressed an occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreMatch {
    pub scope_type: ScopeType,
    pub scope_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSet {
    #[serde(default)]
    pub completions: HashSet<String>,
    #[serde(default)]
    pub ignores: Vec<IgnoreScope>,
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete(mut self, hash: impl Into<String>) -> Self {
        self.completions.insert(hash.into());
        self
    }

    pub fn ignore(mut self, scope: IgnoreScope) -> Self {
        self.ignores.push(scope);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.completions.is_empty() && self.ignores.iter().all(|scope| !scope.active)
    }

    pub fn is_completed(&self, occurrence: &Occurrence) -> bool {
        self.completions.contains(&occurrence.occurrence_hash)
    }

    pub fn ignore_matches(&self, occurrence: &Occurrence) -> Vec<IgnoreMatch> {
        self.ignores
            .iter()
            .filter(|scope| scope.matches(occurrence))
            .map(|scope| IgnoreMatch {
                scope_type: scope.scope_type,
                scope_key: scope.scope_key.clone(),
            })
            .collect()
    }
}

/// Annotates occurrences with completion and ignore state.
///
/// Ignored occurrences are dropped unless `include_ignored` is set, in which
/// case they are kept with `ignored` raised and the matching scopes listed.
pub fn apply_actions(
    occurrences: Vec<Occurrence>,
    actions: &ActionSet,
    include_ignored: bool,
) -> Vec<Occurrence> {
    occurrences
        .into_iter()
        .filter_map(|mut occurrence| {
            occurrence.completed = actions.is_completed(&occurrence);
            let matches = actions.ignore_matches(&occurrence);
            occurrence.ignored = !matches.is_empty();
            if occurrence.ignored && !include_ignored {
                return None;
            }
            occurrence.ignore_matches = matches;
            Some(occurrence)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OccurrenceSource;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn occurrence(kind: ItemKind, id: Uuid, at: DateTime<Utc>, hash: &str) -> Occurrence {
        Occurrence {
            item_kind: kind,
            item_id: id,
            instant: at,
            title: "item".to_string(),
            dtstart: None,
            is_recurring: false,
            rule_string: None,
            occurrence_hash: hash.to_string(),
            completed: false,
            ignored: false,
            ignore_matches: Vec::new(),
            source: OccurrenceSource::ExplicitDate,
        }
    }

    #[test]
    fn test_completion_is_annotated() {
        let id = Uuid::now_v7();
        let occurrences = vec![
            occurrence(ItemKind::Task, id, utc(2025, 1, 1), "aaa"),
            occurrence(ItemKind::Task, id, utc(2025, 1, 2), "bbb"),
        ];
        let actions = ActionSet::new().complete("bbb");
        let result = apply_actions(occurrences, &actions, false);
        assert_eq!(result.len(), 2);
        assert!(!result[0].completed);
        assert!(result[1].completed);
    }

    #[test]
    fn test_occurrence_scope_drops_one() {
        let id = Uuid::now_v7();
        let occurrences = vec![
            occurrence(ItemKind::Task, id, utc(2025, 1, 1), "aaa"),
            occurrence(ItemKind::Task, id, utc(2025, 1, 2), "bbb"),
        ];
        let actions = ActionSet::new().ignore(IgnoreScope::occurrence("aaa"));
        let result = apply_actions(occurrences, &actions, false);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].occurrence_hash, "bbb");
    }

    #[test]
    fn test_list_scope_only_applies_to_lists() {
        let id = Uuid::now_v7();
        let occurrences = vec![
            occurrence(ItemKind::List, id, utc(2025, 1, 1), "aaa"),
            occurrence(ItemKind::Task, id, utc(2025, 1, 1), "bbb"),
        ];
        let actions = ActionSet::new().ignore(IgnoreScope::list(id));
        let result = apply_actions(occurrences, &actions, false);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].item_kind, ItemKind::Task);
    }

    #[test]
    fn test_task_from_scope_is_inclusive() {
        let id = Uuid::now_v7();
        let occurrences = vec![
            occurrence(ItemKind::Task, id, utc(2025, 1, 1), "a"),
            occurrence(ItemKind::Task, id, utc(2025, 1, 2), "b"),
            occurrence(ItemKind::Task, id, utc(2025, 1, 3), "c"),
        ];
        let actions = ActionSet::new().ignore(IgnoreScope::task_from(id, utc(2025, 1, 2)));
        let result = apply_actions(occurrences, &actions, false);
        let hashes: Vec<&str> = result.iter().map(|o| o.occurrence_hash.as_str()).collect();
        assert_eq!(hashes, vec!["a"]);
    }

    #[test]
    fn test_inactive_scope_is_ignored() {
        let id = Uuid::now_v7();
        let occurrences = vec![occurrence(ItemKind::List, id, utc(2025, 1, 1), "a")];
        let actions = ActionSet::new().ignore(IgnoreScope::list(id).inactive());
        assert!(actions.is_empty());
        assert_eq!(apply_actions(occurrences, &actions, false).len(), 1);
    }

    #[test]
    fn test_include_ignored_annotates_every_match() {
        let id = Uuid::now_v7();
        let occurrences = vec![occurrence(ItemKind::List, id, utc(2025, 1, 1), "a")];
        let actions = ActionSet::new()
            .ignore(IgnoreScope::list(id))
            .ignore(IgnoreScope::occurrence("a"));
        let result = apply_actions(occurrences, &actions, true);
        assert_eq!(result.len(), 1);
        assert!(result[0].ignored);
        assert_eq!(result[0].ignore_matches.len(), 2);
        assert_eq!(result[0].ignore_matches[0].scope_type, ScopeType::List);
    }

    #[test]
    fn test_action_set_deserializes() {
        let json = r#"{
            "completions": ["abc"],
            "ignores": [
                {"scope_type": "todo_from", "scope_key": "6f1c1c4e-3b1a-4b8e-9a57-0d2f7c0b9e11", "from_instant": "2025-01-02T00:00:00Z"},
                {"scope_type": "list", "scope_key": "6f1c1c4e-3b1a-4b8e-9a57-0d2f7c0b9e11", "active": false}
            ]
        }"#;
        let actions: ActionSet = serde_json::from_str(json).unwrap();
        assert!(actions.completions.contains("abc"));
        assert_eq!(actions.ignores[0].scope_type, ScopeType::TodoFrom);
        assert!(actions.ignores[0].active);
        assert!(!actions.ignores[1].active);
    }
}
