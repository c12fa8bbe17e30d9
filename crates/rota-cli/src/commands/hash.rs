use anyhow::{Context, Result};
use chrono::Utc;
use rota_core::identity::OccurrenceHasher;
use uuid::Uuid;

use crate::cli::HashCommand;
use crate::config::Config;
use crate::parser::parse_when;

pub fn hash_occurrence(command: HashCommand, config: &Config) -> Result<String> {
    let id = command
        .id
        .trim()
        .parse::<Uuid>()
        .with_context(|| format!("Invalid item id '{}'", command.id))?;
    let instant = parse_when(&command.at, Utc::now(), config.engine.date_order)?;
    let mode = command.mode.map(Into::into).unwrap_or(config.engine.identity);

    Ok(OccurrenceHasher::new(mode).hash(
        command.kind.into(),
        id,
        instant,
        command.rule.as_deref(),
        &command.title,
    ))
}
