use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use rota_core::dates::{DateMatch, MatchTier};
use rota_core::models::{ItemKind, Occurrence};

use crate::timezone::format_in_timezone;

pub fn display_occurrences(occurrences: &[Occurrence], tz: Tz, now: DateTime<Utc>) {
    if occurrences.is_empty() {
        println!("No occurrences found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["When", "Due", "Kind", "Title", "Source", "Hash"]);

    for occurrence in occurrences {
        let mut row = Row::new();
        row.add_cell(Cell::new(format_in_timezone(occurrence.instant, tz)));

        let due_cell = Cell::new(occurrence.instant.humanize());
        let due_cell = if occurrence.completed {
            due_cell
        } else if occurrence.instant < now {
            due_cell.fg(Color::Red) // Overdue
        } else if occurrence.instant.date_naive() == now.date_naive() {
            due_cell.fg(Color::Yellow) // Due today
        } else {
            due_cell
        };
        row.add_cell(due_cell);

        row.add_cell(Cell::new(match occurrence.item_kind {
            ItemKind::List => "list",
            ItemKind::Task => "task",
        }));

        let mut title = String::new();
        if occurrence.is_recurring {
            title.push('↻');
            title.push(' ');
        }
        title.push_str(&occurrence.title);
        if occurrence.ignored {
            title.push_str(" (ignored)");
        }

        let mut title_cell = Cell::new(title);
        if occurrence.completed {
            title_cell = title_cell
                .add_attribute(Attribute::CrossedOut)
                .fg(Color::DarkGrey);
        } else if occurrence.ignored {
            title_cell = title_cell.fg(Color::DarkGrey);
        }
        row.add_cell(title_cell);

        row.add_cell(Cell::new(occurrence.source.to_string()));
        row.add_cell(Cell::new(&occurrence.occurrence_hash[..12.min(occurrence.occurrence_hash.len())]));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_date_matches(matches: &[DateMatch]) {
    if matches.is_empty() {
        println!("No dates found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Span", "Date", "Year", "Tier"]);

    for m in matches {
        let mut row = Row::new();
        row.add_cell(Cell::new(&m.matched_span));
        row.add_cell(Cell::new(m.instant.format("%Y-%m-%d")));
        row.add_cell(if m.year_explicit {
            Cell::new("explicit")
        } else {
            Cell::new("resolved").fg(Color::Yellow)
        });
        row.add_cell(Cell::new(match m.tier {
            MatchTier::Explicit => "pattern",
            MatchTier::FreeText => "free text",
        }));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_instants(instants: &[DateTime<Utc>], tz: Tz) {
    if instants.is_empty() {
        println!("No occurrences found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "When", "Due"]);

    for (index, instant) in instants.iter().enumerate() {
        let mut row = Row::new();
        row.add_cell(Cell::new(index + 1));
        row.add_cell(Cell::new(format_in_timezone(*instant, tz)));
        row.add_cell(Cell::new(instant.humanize()));
        table.add_row(row);
    }

    println!("{table}");
}
