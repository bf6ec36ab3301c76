use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mealplan_core::selection::Direction;
use mealplan_core::service::{MealPlanService, lookup_set};

use super::helpers::{not_found, parse_date, parse_grams, print_json, print_slot, truncate};

pub(crate) fn cmd_set_list(svc: &MealPlanService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct SetRow {
        #[tabled(rename = "")]
        default: &'static str,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Items")]
        items: usize,
    }

    let settings = svc.settings()?;
    if json {
        return print_json(&settings.recipe_sets);
    }

    let rows: Vec<SetRow> = settings
        .recipe_sets
        .iter()
        .map(|set| SetRow {
            default: if settings.default_set_id.as_deref() == Some(set.id.as_str()) {
                "*"
            } else {
                ""
            },
            id: truncate(&set.id, 12),
            name: truncate(&set.name, 30),
            items: set.items_by_slot.values().map(Vec::len).sum(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_set_show(svc: &MealPlanService, set: &str, json: bool) -> Result<()> {
    let settings = svc.settings()?;
    let Some(recipe_set) = lookup_set(&settings, set) else {
        not_found(&format!("Recipe set '{set}' not found"), json);
    };

    if json {
        return print_json(recipe_set);
    }

    let name = &recipe_set.name;
    let id = &recipe_set.id;
    println!("=== {name} ({id}) ===\n");
    for slot in &settings.slots {
        println!("  {} {}", slot.time, slot.name);
        let items = recipe_set.items_for(&slot.id);
        if items.is_empty() {
            println!("    (nothing planned)");
        }
        for item in items {
            println!("    [{}] {} — {}g", item.id, item.name, item.grams);
        }
        println!();
    }
    Ok(())
}

pub(crate) fn cmd_set_add(svc: &MealPlanService, name: &str, json: bool) -> Result<()> {
    let set = svc.add_recipe_set(name)?;
    if json {
        print_json(&set)
    } else {
        let id = &set.id;
        println!("Created recipe set: {name} (id: {id})");
        println!("Add items with: mealplan set item add \"{name}\" <SLOT> <FOOD> <GRAMS>");
        Ok(())
    }
}

pub(crate) fn cmd_set_remove(svc: &MealPlanService, set: &str, json: bool) -> Result<()> {
    let settings = svc.remove_recipe_set(set)?;
    if json {
        print_json(&settings.recipe_sets)
    } else {
        println!("Removed recipe set {set}");
        if settings.recipe_sets.is_empty() {
            println!("No recipe sets left; plans will be empty until you add one");
        }
        Ok(())
    }
}

pub(crate) fn cmd_set_rename(
    svc: &MealPlanService,
    set: &str,
    name: &str,
    json: bool,
) -> Result<()> {
    let settings = svc.rename_recipe_set(set, name)?;
    if json {
        print_json(&settings.recipe_sets)
    } else {
        println!("Renamed recipe set {set} to {name}");
        Ok(())
    }
}

pub(crate) fn cmd_set_default(svc: &MealPlanService, set: &str, json: bool) -> Result<()> {
    let settings = svc.set_default_set(set)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "defaultSetId": settings.default_set_id })
        );
    } else {
        println!("Default recipe set is now {set}");
    }
    Ok(())
}

pub(crate) fn cmd_item_add(
    svc: &MealPlanService,
    set: &str,
    slot: &str,
    name: &str,
    grams: &str,
    json: bool,
) -> Result<()> {
    let grams = parse_grams(grams)?;
    let item = svc.add_item(set, slot, name, grams)?;
    if json {
        print_json(&item)
    } else {
        let id = &item.id;
        println!("Added {name} ({grams}g) to {slot} in {set} (id: {id})");
        Ok(())
    }
}

pub(crate) fn cmd_item_remove(
    svc: &MealPlanService,
    set: &str,
    slot: &str,
    item: &str,
    json: bool,
) -> Result<()> {
    svc.remove_item(set, slot, item)?;
    if json {
        println!("{}", serde_json::json!({ "removed": item }));
    } else {
        println!("Removed {item} from {slot} in {set}");
    }
    Ok(())
}

pub(crate) fn cmd_item_update(
    svc: &MealPlanService,
    set: &str,
    slot: &str,
    item: &str,
    grams: Option<&str>,
    name: Option<&str>,
    json: bool,
) -> Result<()> {
    let grams = grams.map(parse_grams).transpose()?;
    let settings = svc.update_item(set, slot, item, name, grams)?;
    if json {
        let recipe_set = lookup_set(&settings, set);
        print_json(&recipe_set)
    } else {
        println!("Updated {item} in {slot} of {set}");
        Ok(())
    }
}

pub(crate) fn cmd_switch(
    svc: &MealPlanService,
    slot: &str,
    set: Option<&str>,
    next: bool,
    prev: bool,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let view = match (set, next, prev) {
        (Some(set), false, false) => svc.switch_set(date, slot, set)?,
        (None, true, false) => svc.cycle_set(date, slot, Direction::Next)?,
        (None, false, true) => svc.cycle_set(date, slot, Direction::Previous)?,
        (None, false, false) => svc.clear_set_override(date, slot)?,
        _ => bail!("Give either a recipe set, --next, or --prev"),
    };
    let Some(view) = view else {
        not_found(&format!("Slot '{slot}' not found"), json);
    };

    if json {
        print_json(&view)
    } else {
        print_slot(&view, false);
        Ok(())
    }
}
