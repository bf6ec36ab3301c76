use anyhow::Result;

use mealplan_core::plan::PlanEntry;
use mealplan_core::service::MealPlanService;

use super::helpers::{format_grams, not_found, parse_date, parse_grams, print_json, print_slot};

fn describe(entry: &PlanEntry) -> String {
    let state = if entry.is_checked() { "done" } else { "not done" };
    let actual = format_grams(entry.actual_grams());
    format!("{} — {actual} ({state})", entry.name())
}

pub(crate) fn cmd_check(
    svc: &MealPlanService,
    slot: &str,
    entry: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let Some(updated) = svc.toggle_entry(date, slot, entry)? else {
        not_found(&format!("No entry '{entry}' in slot '{slot}' on {date}"), json);
    };

    if json {
        print_json(&updated)
    } else {
        println!("{}", describe(&updated));
        Ok(())
    }
}

pub(crate) fn cmd_grams(
    svc: &MealPlanService,
    slot: &str,
    entry: &str,
    grams: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let grams = parse_grams(grams)?;
    let Some(updated) = svc.set_actual_grams(date, slot, entry, grams)? else {
        not_found(&format!("No entry '{entry}' in slot '{slot}' on {date}"), json);
    };

    if json {
        print_json(&updated)
    } else {
        println!("{}", describe(&updated));
        Ok(())
    }
}

pub(crate) fn cmd_add(
    svc: &MealPlanService,
    slot: &str,
    name: &str,
    grams: Option<&str>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let grams = grams.map(parse_grams).transpose()?.unwrap_or(0);
    let Some(log) = svc.add_custom(date, slot, name, grams)? else {
        not_found(&format!("Slot '{slot}' not found"), json);
    };

    if json {
        print_json(&log)
    } else {
        let id = &log.id;
        println!("Added {name} ({grams}g) to {slot} on {date} (id: {id})");
        Ok(())
    }
}

pub(crate) fn cmd_remove(
    svc: &MealPlanService,
    slot: &str,
    log_id: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    if svc.remove_custom(date, slot, log_id)? {
        if json {
            println!("{}", serde_json::json!({ "removed": log_id }));
        } else {
            println!("Removed entry {log_id}");
        }
        Ok(())
    } else {
        not_found(&format!("Entry {log_id} not found in {slot} on {date}"), json);
    }
}

pub(crate) fn cmd_done(
    svc: &MealPlanService,
    slot: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let Some(view) = svc.complete_all(date, slot)? else {
        not_found(&format!("Slot '{slot}' not found"), json);
    };

    if json {
        print_json(&view)
    } else {
        print_slot(&view, false);
        Ok(())
    }
}

pub(crate) fn cmd_save(
    svc: &MealPlanService,
    slot: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let Some(newly_saved) = svc.mark_saved(date, slot)? else {
        not_found(&format!("Slot '{slot}' not found"), json);
    };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "slot": slot,
                "date": date.to_string(),
                "newlySaved": newly_saved,
            })
        );
    } else if newly_saved {
        println!("Saved {slot} for {date}");
    } else {
        println!("{slot} was already saved for {date}");
    }
    Ok(())
}
