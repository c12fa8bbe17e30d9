use anyhow::Result;
use chrono::{DateTime, Utc};
use owo_colors::{OwoColorize, Style};
use rota_core::dates::{DateExtractor, DateMatch};
use rota_core::phrase::{PhraseParser, RecurrenceDescriptor};
use rota_core::recurrence::compile;
use serde::Serialize;

use crate::cli::ParseCommand;
use crate::config::Config;
use crate::parser::parse_when;
use crate::views::table::display_date_matches;

#[derive(Debug, Serialize)]
pub struct ParseReport {
    pub text: String,
    pub reference: DateTime<Utc>,
    pub pattern: Option<&'static str>,
    pub phrase: Option<String>,
    pub descriptor: Option<RecurrenceDescriptor>,
    pub rule_string: Option<String>,
    /// Anchor the rule would be compiled against: the first date mention.
    pub dtstart: Option<DateTime<Utc>>,
    pub dates: Vec<DateMatch>,
}

pub fn build_report(command: &ParseCommand, reference: DateTime<Utc>, config: &Config) -> ParseReport {
    let text = command.text.as_str();
    let mut extractor_config = config.engine.extractor_config();
    if let Some(order) = command.order {
        extractor_config.order = order.into();
    }
    let extractor = DateExtractor::new(extractor_config);
    let dates = extractor.extract_all_relative_to(text, reference);
    let phrase = PhraseParser::new().find(text);

    let dtstart = dates.first().map(|m| m.instant);
    let rule_string = phrase.as_ref().map(|p| {
        // Without an anchor the rule string alone is still informative.
        compile(&p.descriptor, dtstart.unwrap_or(reference))
            .map(|rule| rule.rule_string().to_string())
            .unwrap_or_else(|_| p.descriptor.to_rule_string())
    });

    ParseReport {
        text: text.to_string(),
        reference,
        pattern: phrase.as_ref().map(|p| p.pattern),
        phrase: phrase.as_ref().map(|p| p.matched_span.clone()),
        descriptor: phrase.map(|p| p.descriptor),
        rule_string,
        dtstart,
        dates,
    }
}

pub fn parse_text(command: ParseCommand, config: &Config) -> Result<()> {
    let order = command.order.map(Into::into).unwrap_or(config.engine.date_order);
    let reference = match command.at.as_deref() {
        Some(at) => parse_when(at, Utc::now(), order)?,
        None => Utc::now(),
    };
    let report = build_report(&command, reference, config);

    if command.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let label = Style::new().blue();
    match (&report.phrase, &report.rule_string) {
        (Some(phrase), Some(rule)) => {
            println!("{} {}", "Recurrence:".style(label), phrase.bright_white().bold());
            println!("  {} {}", "→".style(label), rule.yellow());
            if let Some(pattern) = report.pattern {
                println!("  {} matched by {}", "→".style(label), pattern.bright_black());
            }
            match report.dtstart {
                Some(dtstart) => println!("  {} anchored at {}", "→".style(label), dtstart.format("%Y-%m-%d")),
                None => println!(
                    "  {} {}",
                    "→".style(label),
                    "no anchor date, the rule will not be expanded".bright_black()
                ),
            }
        }
        _ => println!("{} none", "Recurrence:".style(label)),
    }
    println!();
    display_date_matches(&report.dates);
    Ok(())
}
