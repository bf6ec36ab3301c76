use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use mealplan_core::models::SLOT_NAME_SUGGESTIONS;
use mealplan_core::service::MealPlanService;

use super::helpers::{print_json, truncate};

pub(crate) fn cmd_slot_list(svc: &MealPlanService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct SlotRow {
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "ID")]
        id: String,
    }

    let settings = svc.settings()?;
    if json {
        return print_json(&settings.slots);
    }

    if settings.slots.is_empty() {
        println!("No meal slots. Try one of: {}", SLOT_NAME_SUGGESTIONS.join(", "));
        return Ok(());
    }

    let rows: Vec<SlotRow> = settings
        .slots
        .iter()
        .map(|s| SlotRow {
            time: s.time.clone(),
            name: truncate(&s.name, 20),
            id: s.id.clone(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_slot_add(
    svc: &MealPlanService,
    name: &str,
    time: &str,
    json: bool,
) -> Result<()> {
    let slot = svc.add_slot(name, time)?;
    if json {
        print_json(&slot)
    } else {
        let id = &slot.id;
        let time = &slot.time;
        println!("Added slot {name} at {time} (id: {id})");
        Ok(())
    }
}

pub(crate) fn cmd_slot_remove(svc: &MealPlanService, slot: &str, json: bool) -> Result<()> {
    let removed = svc.remove_slot(slot)?;
    if json {
        print_json(&removed)
    } else {
        let name = &removed.name;
        println!("Removed slot {name} and its planned items from every recipe set");
        Ok(())
    }
}

pub(crate) fn cmd_slot_rename(
    svc: &MealPlanService,
    slot: &str,
    name: &str,
    json: bool,
) -> Result<()> {
    let settings = svc.rename_slot(slot, name)?;
    if json {
        print_json(&settings.slots)
    } else {
        println!("Renamed slot {slot} to {name}");
        Ok(())
    }
}

pub(crate) fn cmd_slot_time(
    svc: &MealPlanService,
    slot: &str,
    time: &str,
    json: bool,
) -> Result<()> {
    let settings = svc.set_slot_time(slot, time)?;
    if json {
        print_json(&settings.slots)
    } else {
        println!("Slot {slot} is now at {time}");
        Ok(())
    }
}
