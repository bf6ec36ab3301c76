use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mealplan_core::plan::{PlanEntry, SlotView};

/// Parse a gram amount: "200" or "200g". Zero is allowed (black coffee has none).
pub(crate) fn parse_grams(s: &str) -> Result<u32> {
    let trimmed = s.trim().trim_end_matches('g').trim();
    if trimmed.starts_with('-') {
        bail!("Grams must not be negative");
    }
    trimmed
        .parse()
        .with_context(|| format!("Invalid amount: '{s}'. Use a whole number like '200' or '200g'"))
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a missing slot/entry/set and exit with status 2.
pub(crate) fn not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn format_grams(grams: Option<u32>) -> String {
    grams.map_or_else(|| "-".to_string(), |g| format!("{g}g"))
}

fn entry_mark(entry: &PlanEntry) -> &'static str {
    if entry.is_checked() { "[x]" } else { "[ ]" }
}

pub(crate) fn print_slot(view: &SlotView, saved: bool) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "")]
        mark: &'static str,
        #[tabled(rename = "Food")]
        name: String,
        #[tabled(rename = "Planned")]
        planned: String,
        #[tabled(rename = "Actual")]
        actual: String,
        #[tabled(rename = "Ref")]
        reference: String,
    }

    let slot = &view.slot;
    let done = view.completed_count();
    let total = view.entries.len();
    let saved = if saved { "  (saved)" } else { "" };
    println!(
        "  {} {} — {} — {done}/{total}{saved}",
        slot.time, slot.name, view.active_set_name
    );

    if view.entries.is_empty() {
        println!("    (nothing planned)\n");
        return;
    }

    let rows: Vec<EntryRow> = view
        .entries
        .iter()
        .map(|e| EntryRow {
            mark: entry_mark(e),
            name: if e.is_custom() {
                format!("{} *", truncate(e.name(), 28))
            } else {
                truncate(e.name(), 30)
            },
            planned: format!("{}g", e.planned_grams()),
            actual: format_grams(e.actual_grams()),
            // Custom entries are removed by log id.
            reference: e
                .log()
                .filter(|_| e.is_custom())
                .map_or_else(|| e.item_id().to_string(), |l| l.id.clone()),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}\n");
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
