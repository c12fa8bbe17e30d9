use anyhow::Result;
use chrono::Utc;
use owo_colors::{OwoColorize, Style};
use rota_core::recurrence::AnchoredRule;

use crate::cli::PreviewCommand;
use crate::config::Config;
use crate::parser::parse_when;
use crate::timezone::display_timezone;
use crate::views::table::display_instants;

pub fn preview_rule(command: PreviewCommand, config: &Config) -> Result<()> {
    let now = Utc::now();
    let order = config.engine.date_order;
    let dtstart = parse_when(&command.dtstart, now, order)?;
    let from = match command.from.as_deref() {
        Some(from) => parse_when(from, now, order)?,
        None => dtstart,
    };

    let rule = AnchoredRule::decompile(&command.rule, dtstart)?;
    let instants = rule.preview(from, command.count);

    let info_style = Style::new().blue();
    println!(
        "{} {} from {}",
        "Rule:".style(info_style),
        rule.rule_string().yellow(),
        rule.dtstart().format("%Y-%m-%d %H:%M UTC")
    );
    let tz = display_timezone(config.display_timezone.as_deref())?;
    display_instants(&instants, tz);
    Ok(())
}
