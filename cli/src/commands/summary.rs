use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mealplan_core::service::MealPlanService;

use super::helpers::{format_grams, parse_date, print_json, print_slot, truncate};

pub(crate) fn cmd_today(svc: &MealPlanService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let plan = svc.plan_for(date)?;

    if json {
        return print_json(&plan);
    }

    if plan.slots.is_empty() {
        eprintln!("No meal slots configured. Add one with: mealplan slot add <NAME> <HH:MM>");
        process::exit(2);
    }

    let day = &plan.date;
    println!("=== {day} ===\n");
    for view in &plan.slots {
        let saved = plan.saved_slots.contains(&view.slot.id);
        print_slot(view, saved);
    }

    let done = plan.progress.completed;
    let total = plan.progress.total;
    let pct = plan.progress.percent();
    println!("  PROGRESS: {done}/{total} ({pct:.0}%)");

    Ok(())
}

pub(crate) fn cmd_history(svc: &MealPlanService, days: Option<usize>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Slot")]
        slot: String,
        #[tabled(rename = "Food")]
        food: String,
        #[tabled(rename = "Planned")]
        planned: String,
        #[tabled(rename = "Actual")]
        actual: String,
        #[tabled(rename = "Done")]
        done: &'static str,
    }

    let history = svc.history(days)?;

    if json {
        return print_json(&history);
    }

    if history.is_empty() {
        eprintln!("No meals logged yet");
        process::exit(2);
    }

    let settings = svc.settings()?;
    let rows: Vec<HistoryRow> = history
        .iter()
        .flat_map(|day| day.entries.iter())
        .map(|log| HistoryRow {
            date: log.date.clone(),
            slot: settings.slot_name(&log.slot_id).to_string(),
            food: if log.is_custom {
                format!("{} *", truncate(&log.item_name, 28))
            } else {
                truncate(&log.item_name, 30)
            },
            planned: format!("{}g", log.planned_grams),
            actual: format_grams(log.actual_grams),
            done: if log.checked { "yes" } else { "" },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}
