//! Content-derived identity for occurrences.
//!
//! Occurrences are recomputed on every request, so the only durable handle a
//! client holds is the hash computed here. Inputs are normalized (UTC instant
//! at second precision, missing rule as `""`, trimmed lower-case title) and
//! encoded as key-sorted JSON before hashing with SHA-256.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ItemKind;

/// Which inputs participate in the occurrence hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    /// Kind, id, instant and rule. Editing the title keeps completions attached.
    #[default]
    Stable,
    /// Kind, id, instant, rule and title.
    Content,
}

impl fmt::Display for IdentityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityMode::Stable => write!(f, "stable"),
            IdentityMode::Content => write!(f, "content"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid identity mode: {0}")]
pub struct ParseIdentityModeError(String);

impl FromStr for IdentityMode {
    type Err = ParseIdentityModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stable" => Ok(IdentityMode::Stable),
            "content" => Ok(IdentityMode::Content),
            _ => Err(ParseIdentityModeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OccurrenceHasher {
    mode: IdentityMode,
}

impl OccurrenceHasher {
    pub fn new(mode: IdentityMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> IdentityMode {
        self.mode
    }

    /// 64-character lower-case hex digest of the normalized inputs.
    pub fn hash(
        &self,
        kind: ItemKind,
        id: Uuid,
        instant: DateTime<Utc>,
        rule: Option<&str>,
        title: &str,
    ) -> String {
        let canonical = self.canonical_form(kind, id, instant, rule, title);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Key-sorted JSON encoding that feeds the digest.
    pub fn canonical_form(
        &self,
        kind: ItemKind,
        id: Uuid,
        instant: DateTime<Utc>,
        rule: Option<&str>,
        title: &str,
    ) -> String {
        let mut fields = BTreeMap::new();
        fields.insert("id", id.to_string());
        fields.insert("kind", kind.to_string());
        fields.insert("occ", instant.format("%Y-%m-%dT%H:%M:%SZ").to_string());
        fields.insert("rrule", rule.unwrap_or_default().trim().to_string());
        if self.mode == IdentityMode::Content {
            fields.insert("title", title.trim().to_lowercase());
        }
        // A map of strings always serializes.
        serde_json::to_string(&fields).unwrap_or_default()
    }
}

/// Hash with every input included, title too.
pub fn occurrence_hash(
    kind: ItemKind,
    id: Uuid,
    instant: DateTime<Utc>,
    rule: Option<&str>,
    title: &str,
) -> String {
    OccurrenceHasher::new(IdentityMode::Content).hash(kind, id, instant, rule, title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, h, 0, 0).unwrap()
    }

    fn fixed_id() -> Uuid {
        Uuid::parse_str("6f1c1c4e-3b1a-4b8e-9a57-0d2f7c0b9e11").unwrap()
    }

    #[test]
    fn test_digest_shape() {
        let digest = occurrence_hash(ItemKind::Task, fixed_id(), at(9), None, "Water plants");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_canonical_form_is_key_sorted() {
        let hasher = OccurrenceHasher::new(IdentityMode::Content);
        let canonical = hasher.canonical_form(
            ItemKind::List,
            fixed_id(),
            at(9),
            Some("FREQ=DAILY;INTERVAL=1"),
            "  Groceries ",
        );
        assert_eq!(
            canonical,
            format!(
                r#"{{"id":"{}","kind":"list","occ":"2025-09-01T09:00:00Z","rrule":"FREQ=DAILY;INTERVAL=1","title":"groceries"}}"#,
                fixed_id()
            )
        );
    }

    #[test]
    fn test_title_normalization() {
        let a = occurrence_hash(ItemKind::Task, fixed_id(), at(9), None, "Water Plants");
        let b = occurrence_hash(ItemKind::Task, fixed_id(), at(9), None, "  water plants\n");
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_rule_equals_empty_rule() {
        let a = occurrence_hash(ItemKind::Task, fixed_id(), at(9), None, "x");
        let b = occurrence_hash(ItemKind::Task, fixed_id(), at(9), Some(""), "x");
        assert_eq!(a, b);
    }

    #[test]
    fn test_sub_second_precision_is_dropped() {
        let precise = at(9) + chrono::Duration::milliseconds(250);
        let a = occurrence_hash(ItemKind::Task, fixed_id(), at(9), None, "x");
        let b = occurrence_hash(ItemKind::Task, fixed_id(), precise, None, "x");
        assert_eq!(a, b);
    }

    #[test]
    fn test_stable_mode_ignores_title_edits() {
        let hasher = OccurrenceHasher::default();
        let before = hasher.hash(ItemKind::Task, fixed_id(), at(9), None, "call mom");
        let after = hasher.hash(ItemKind::Task, fixed_id(), at(9), None, "call mom about dinner");
        assert_eq!(before, after);
    }

    #[test]
    fn test_content_mode_tracks_title_edits() {
        let hasher = OccurrenceHasher::new(IdentityMode::Content);
        let before = hasher.hash(ItemKind::Task, fixed_id(), at(9), None, "call mom");
        let after = hasher.hash(ItemKind::Task, fixed_id(), at(9), None, "call mom about dinner");
        assert_ne!(before, after);
    }

    #[test]
    fn test_identity_mode_from_str() {
        assert_eq!("STABLE".parse::<IdentityMode>(), Ok(IdentityMode::Stable));
        assert_eq!("content".parse::<IdentityMode>(), Ok(IdentityMode::Content));
        assert!("title".parse::<IdentityMode>().is_err());
    }

    proptest! {
        #[test]
        fn prop_hash_is_deterministic(
            id in any::<u128>(),
            secs in 0i64..4_000_000_000,
            title in "[a-zA-Z ]{0,24}",
        ) {
            let id = Uuid::from_u128(id);
            let instant = Utc.timestamp_opt(secs, 0).unwrap();
            let a = occurrence_hash(ItemKind::Task, id, instant, Some("FREQ=WEEKLY;INTERVAL=1"), &title);
            let b = occurrence_hash(ItemKind::Task, id, instant, Some("FREQ=WEEKLY;INTERVAL=1"), &title);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_each_field_changes_digest(
            id in any::<u128>(),
            other_id in any::<u128>(),
            secs in 0i64..4_000_000_000,
            shift in 1i64..1_000_000,
        ) {
            prop_assume!(id != other_id);
            let id = Uuid::from_u128(id);
            let instant = Utc.timestamp_opt(secs, 0).unwrap();
            let base = occurrence_hash(ItemKind::Task, id, instant, None, "title");

            prop_assert_ne!(&base, &occurrence_hash(ItemKind::List, id, instant, None, "title"));
            prop_assert_ne!(&base, &occurrence_hash(ItemKind::Task, Uuid::from_u128(other_id), instant, None, "title"));
            prop_assert_ne!(&base, &occurrence_hash(ItemKind::Task, id, instant + chrono::Duration::seconds(shift), None, "title"));
            prop_assert_ne!(&base, &occurrence_hash(ItemKind::Task, id, instant, Some("FREQ=DAILY;INTERVAL=1"), "title"));
            prop_assert_ne!(&base, &occurrence_hash(ItemKind::Task, id, instant, None, "other"));
        }
    }
}
