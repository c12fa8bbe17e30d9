use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use rota_core::config::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "rota.toml";
pub const DEFAULT_DATA_FILE: &str = "rota.json";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Agenda document read by `rota agenda`
    pub data_file: PathBuf,
    /// IANA timezone used for display; detected from the system when absent
    pub display_timezone: Option<String>,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            display_timezone: None,
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    /// Defaults, then `rota.toml`, then `ROTA_*` environment variables.
    ///
    /// Nested keys use a double underscore: `ROTA_ENGINE__DATE_ORDER=mdy`.
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("ROTA_").split("__"))
    }
}
