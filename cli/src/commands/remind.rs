use anyhow::Result;
use chrono::Local;
use tabled::{Table, Tabled, settings::Style};

use mealplan_core::service::MealPlanService;

use super::helpers::{print_json, truncate};

/// Print the reminder schedule, or with `due` only the reminders firing right now
/// (meant to be run from cron every minute).
pub(crate) fn cmd_remind(svc: &MealPlanService, due: bool, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct ReminderRow {
        #[tabled(rename = "#")]
        id: usize,
        #[tabled(rename = "Next")]
        at: String,
        #[tabled(rename = "Message")]
        body: String,
    }

    let now = Local::now().naive_local();
    let reminders = if due {
        svc.due_reminders(now)?
    } else {
        svc.reminders(now)?
    };

    if json {
        return print_json(&reminders);
    }

    if due {
        for r in &reminders {
            println!("{}: {}", r.title, r.body);
        }
        return Ok(());
    }

    if reminders.is_empty() {
        eprintln!("No reminders. Slots need a valid HH:MM time");
        return Ok(());
    }

    let rows: Vec<ReminderRow> = reminders
        .iter()
        .map(|r| ReminderRow {
            id: r.id,
            at: r.at.format("%Y-%m-%d %H:%M").to_string(),
            body: truncate(&r.body, 50),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}
