use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use owo_colors::{OwoColorize, Style};
use rota_core::expansion::OccurrenceEngine;
use rota_core::models::{ExpansionRequest, QueryWindow};
use rota_core::source::{collect_agenda, JsonFileSource};

use crate::cli::AgendaCommand;
use crate::config::Config;
use crate::parser::parse_when;
use crate::timezone::display_timezone;
use crate::views::table::display_occurrences;

/// Builds the request from command flags, falling back to configured defaults.
pub fn build_request(command: &AgendaCommand, config: &Config, now: DateTime<Utc>) -> Result<ExpansionRequest> {
    let engine = &config.engine;
    let default_window = QueryWindow::around(now, engine.grace_days, engine.lookahead_days);
    let start = match command.from.as_deref() {
        Some(from) => parse_when(from, now, engine.date_order)?,
        None => default_window.start,
    };
    let end = match command.to.as_deref() {
        Some(to) => parse_when(to, now, engine.date_order)?,
        None => default_window.end,
    };
    let window = QueryWindow::new(start, end)?;

    Ok(ExpansionRequest::new(window)
        .with_caps(
            command.max_per_item.unwrap_or(engine.max_per_item),
            command.max_total.unwrap_or(engine.max_total),
        )
        .including_ignored(command.include_ignored)
        .expanded(!command.collapse))
}

pub async fn show_agenda(command: AgendaCommand, config: &Config) -> Result<()> {
    let now = Utc::now();
    let request = build_request(&command, config, now)?;
    let path = command.file.clone().unwrap_or_else(|| config.data_file.clone());
    let source = JsonFileSource::new(&path);
    let engine = OccurrenceEngine::new(&config.engine);

    let expansion = collect_agenda(&source, &engine, &request)
        .await
        .with_context(|| format!("Failed to build agenda from '{}'", path.display()))?;

    let warning = Style::new().yellow().bold();
    for error in &expansion.errors {
        eprintln!("{} {}", "Warning:".style(warning), error);
    }

    if command.json {
        println!("{}", serde_json::to_string_pretty(&expansion)?);
        return Ok(());
    }

    let tz = display_timezone(config.display_timezone.as_deref())?;
    display_occurrences(&expansion.occurrences, tz, now);
    if expansion.truncated {
        println!(
            "{} Results were truncated; narrow the window or raise --max-per-item / --max-total.",
            "→".style(warning)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rota_core::error::CoreError;

    fn command() -> AgendaCommand {
        AgendaCommand {
            file: None,
            from: None,
            to: None,
            max_per_item: None,
            max_total: None,
            include_ignored: false,
            collapse: false,
            json: false,
        }
    }

    #[test]
    fn test_default_request_uses_config() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        let request = build_request(&command(), &Config::default(), now).unwrap();
        assert_eq!(request.window.start, Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap());
        assert_eq!(request.window.end, Utc.with_ymd_and_hms(2025, 7, 15, 0, 0, 0).unwrap());
        assert_eq!(request.max_per_item, 100);
        assert_eq!(request.max_total, 1000);
        assert!(request.expand);
    }

    #[test]
    fn test_flags_override_config() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        let mut cmd = command();
        cmd.from = Some("2025-09-01T00:00:00Z".to_string());
        cmd.to = Some("2025-09-30T00:00:00Z".to_string());
        cmd.max_total = Some(5);
        cmd.collapse = true;
        let request = build_request(&cmd, &Config::default(), now).unwrap();
        assert_eq!(request.window.start, Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap());
        assert_eq!(request.max_total, 5);
        assert!(!request.expand);
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let now = Utc::now();
        let mut cmd = command();
        cmd.from = Some("2025-09-30T00:00:00Z".to_string());
        cmd.to = Some("2025-09-01T00:00:00Z".to_string());
        let err = build_request(&cmd, &Config::default(), now).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidWindow { .. })
        ));
    }
}
