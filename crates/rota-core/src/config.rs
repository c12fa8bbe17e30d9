use serde::{Deserialize, Serialize};

use crate::dates::{DateOrder, ExtractorConfig};
use crate::identity::IdentityMode;
use crate::yearless::{YearlessResolver, DEFAULT_CAP_YEARS};

/// Configuration for the occurrence engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How ambiguous numeric dates like `12/9/2025` are read
    pub date_order: DateOrder,
    /// Inputs that take part in the occurrence hash
    pub identity: IdentityMode,
    /// Hard limit on how far past creation a yearless date may resolve;
    /// `null` removes it
    pub yearless_cap_years: Option<u32>,
    pub max_per_item: usize,
    pub max_total: usize,
    /// Default window end, in days after now
    pub lookahead_days: u32,
    /// Include near-past in default windows (days)
    pub grace_days: u32,
    /// Longest word window tried by the free-text date search
    pub max_phrase_words: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            date_order: DateOrder::Dmy,
            identity: IdentityMode::Stable,
            yearless_cap_years: Some(DEFAULT_CAP_YEARS),
            max_per_item: 100,
            max_total: 1000,
            lookahead_days: 30,
            grace_days: 3,
            max_phrase_words: 4,
        }
    }
}

impl EngineConfig {
    pub fn resolver(&self) -> YearlessResolver {
        YearlessResolver::from_cap(self.yearless_cap_years)
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            order: self.date_order,
            max_phrase_words: self.max_phrase_words,
            resolver: self.resolver(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"date_order": "mdy", "yearless_cap_years": 1}"#).unwrap();
        assert_eq!(config.date_order, DateOrder::Mdy);
        assert_eq!(config.resolver(), YearlessResolver::capped(1));
        assert_eq!(config.max_total, 1000);
        assert_eq!(config.identity, IdentityMode::Stable);
    }

    #[test]
    fn test_yearless_cap_defaults_to_finite_bound() {
        let config = EngineConfig::default();
        assert_eq!(config.yearless_cap_years, Some(DEFAULT_CAP_YEARS));
        assert_eq!(config.resolver(), YearlessResolver::default());

        let uncapped: EngineConfig =
            serde_json::from_str(r#"{"yearless_cap_years": null}"#).unwrap();
        assert_eq!(uncapped.resolver(), YearlessResolver::uncapped());
    }

    #[test]
    fn test_extractor_config_follows_engine_config() {
        let config = EngineConfig {
            max_phrase_words: 2,
            ..Default::default()
        };
        let extractor = config.extractor_config();
        assert_eq!(extractor.max_phrase_words, 2);
        assert_eq!(extractor.order, DateOrder::Dmy);
    }
}
