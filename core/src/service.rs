use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use serde::Serialize;

use crate::db::{Database, ImportSummary};
use crate::export::{BackupData, DayLogs, group_by_date, logs_to_csv, logs_to_json};
use crate::logbook::{
    LogUpsert, complete_all, is_meal_saved, mark_meal_saved, remove_log, upsert_logs,
};
use crate::models::{
    LogEntry, MealItem, MealSlot, RecipeSet, SavedMeals, Selection, Settings, format_date, new_id,
    validate_name,
};
use crate::plan::{DayProgress, PlanEntry, SlotView, resolve_plan, resolve_slot};
use crate::reminders::{Reminder, due_reminders, reminder_schedule};
use crate::selection::{
    Direction, adjacent_set_id, clear_selection, resolve_active_set_id, select_set,
};

/// A whole day: every slot's view plus overall progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub date: String,
    pub slots: Vec<SlotView>,
    pub progress: DayProgress,
    pub saved_slots: Vec<String>,
}

/// Find a slot by id, falling back to its display name.
#[must_use]
pub fn lookup_slot<'a>(settings: &'a Settings, key: &str) -> Option<&'a MealSlot> {
    settings
        .slot(key)
        .or_else(|| settings.slots.iter().find(|s| s.name == key))
}

/// Find a recipe set by id, falling back to its name.
#[must_use]
pub fn lookup_set<'a>(settings: &'a Settings, key: &str) -> Option<&'a RecipeSet> {
    settings
        .recipe_set(key)
        .or_else(|| settings.recipe_sets.iter().find(|s| s.name == key))
}

/// Find an entry of a slot view by item id, log id, or name (first match).
#[must_use]
pub fn find_entry<'a>(view: &'a SlotView, key: &str) -> Option<&'a PlanEntry> {
    view.entries
        .iter()
        .find(|e| e.item_id() == key || e.log().is_some_and(|l| l.id == key))
        .or_else(|| view.entries.iter().find(|e| e.name() == key))
}

fn require_slot<'a>(settings: &'a Settings, key: &str) -> Result<&'a MealSlot> {
    lookup_slot(settings, key).with_context(|| format!("Slot '{key}' not found"))
}

fn require_set<'a>(settings: &'a Settings, key: &str) -> Result<&'a RecipeSet> {
    lookup_set(settings, key).with_context(|| format!("Recipe set '{key}' not found"))
}

pub struct MealPlanService {
    db: Database,
}

impl MealPlanService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    // --- Stored state ---

    pub fn settings(&self) -> Result<Settings> {
        self.db.load_settings()
    }

    pub fn logs(&self) -> Result<Vec<LogEntry>> {
        self.db.load_logs()
    }

    pub fn selection(&self) -> Result<Selection> {
        self.db.load_selection()
    }

    pub fn saved_meals(&self) -> Result<SavedMeals> {
        self.db.load_saved_meals()
    }

    /// Load settings, apply `edit`, and persist the result.
    pub fn edit_settings(
        &self,
        edit: impl FnOnce(&Settings) -> Result<Settings>,
    ) -> Result<Settings> {
        let next = edit(&self.settings()?)?;
        self.db.save_settings(&next)?;
        Ok(next)
    }

    fn apply(&self, candidates: Vec<LogUpsert>) -> Result<()> {
        debug!("Applying {} log upserts", candidates.len());
        let next = upsert_logs(&self.logs()?, candidates);
        self.db.replace_logs(&next)
    }

    // --- Plan ---

    pub fn plan_for(&self, date: NaiveDate) -> Result<DayPlan> {
        let date = format_date(date);
        let settings = self.settings()?;
        let slots = resolve_plan(
            &settings,
            &self.db.logs_for_date(&date)?,
            &date,
            &self.selection()?,
        );
        let saved = self.saved_meals()?;
        let saved_slots = settings
            .slots
            .iter()
            .filter(|s| is_meal_saved(&saved, &date, &s.id))
            .map(|s| s.id.clone())
            .collect();
        Ok(DayPlan {
            progress: DayProgress::from_views(&slots),
            date,
            slots,
            saved_slots,
        })
    }

    /// Resolved view of one slot. `None` if no slot matches `slot_key`.
    pub fn slot_view(&self, date: NaiveDate, slot_key: &str) -> Result<Option<SlotView>> {
        let date = format_date(date);
        let settings = self.settings()?;
        let Some(slot) = lookup_slot(&settings, slot_key) else {
            return Ok(None);
        };
        let logs = self.db.logs_for_date_and_slot(&date, &slot.id)?;
        Ok(resolve_slot(&settings, &logs, &date, &slot.id, &self.selection()?))
    }

    fn update_entry(
        &self,
        date: NaiveDate,
        slot_key: &str,
        entry_key: &str,
        intent: impl FnOnce(&PlanEntry, &str, &str) -> LogUpsert,
    ) -> Result<Option<PlanEntry>> {
        let Some(view) = self.slot_view(date, slot_key)? else {
            return Ok(None);
        };
        let Some(entry) = find_entry(&view, entry_key) else {
            return Ok(None);
        };
        let item_id = entry.item_id().to_string();
        self.apply(vec![intent(entry, &format_date(date), &view.slot.id)])?;

        let view = self
            .slot_view(date, &view.slot.id)?
            .context("Slot disappeared while updating")?;
        Ok(view.entries.into_iter().find(|e| e.item_id() == item_id))
    }

    /// Flip an entry's checked state. `None` if the slot or entry does not exist.
    pub fn toggle_entry(
        &self,
        date: NaiveDate,
        slot_key: &str,
        entry_key: &str,
    ) -> Result<Option<PlanEntry>> {
        self.update_entry(date, slot_key, entry_key, PlanEntry::toggle)
    }

    pub fn set_actual_grams(
        &self,
        date: NaiveDate,
        slot_key: &str,
        entry_key: &str,
        grams: u32,
    ) -> Result<Option<PlanEntry>> {
        self.update_entry(date, slot_key, entry_key, |entry, date, slot_id| {
            entry.with_actual_grams(date, slot_id, grams)
        })
    }

    /// Log an ad-hoc food. `None` if the slot does not exist.
    pub fn add_custom(
        &self,
        date: NaiveDate,
        slot_key: &str,
        name: &str,
        grams: u32,
    ) -> Result<Option<LogEntry>> {
        let name = validate_name("Food", name)?;
        let settings = self.settings()?;
        let Some(slot) = lookup_slot(&settings, slot_key) else {
            return Ok(None);
        };
        let candidate = LogUpsert::custom(&format_date(date), &slot.id, &name, grams);
        let item_id = candidate.item_id.clone();
        self.apply(vec![candidate])?;
        Ok(self
            .logs()?
            .into_iter()
            .rev()
            .find(|l| Some(&l.item_id) == item_id.as_ref()))
    }

    /// Delete a custom entry. Returns false when the slot is unknown or no log with `log_id`
    /// exists for it.
    pub fn remove_custom(&self, date: NaiveDate, slot_key: &str, log_id: &str) -> Result<bool> {
        let settings = self.settings()?;
        let Some(slot) = lookup_slot(&settings, slot_key) else {
            return Ok(false);
        };
        let date = format_date(date);
        let logs = self.logs()?;
        let Some(target) = logs
            .iter()
            .find(|l| l.id == log_id && l.is_for(&date, &slot.id))
        else {
            return Ok(false);
        };
        if !target.is_custom {
            bail!("Entry '{log_id}' is a planned item; uncheck it instead of removing it");
        }
        match remove_log(&logs, log_id) {
            Some(next) => {
                self.db.replace_logs(&next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Check every entry of a slot, or uncheck all of them if the slot is already complete.
    pub fn complete_all(&self, date: NaiveDate, slot_key: &str) -> Result<Option<SlotView>> {
        let Some(view) = self.slot_view(date, slot_key)? else {
            return Ok(None);
        };
        self.apply(complete_all(&view, &format_date(date)))?;
        self.slot_view(date, &view.slot.id)
    }

    // --- Recipe set selection ---

    /// Override the active recipe set for one date and slot.
    pub fn switch_set(
        &self,
        date: NaiveDate,
        slot_key: &str,
        set_key: &str,
    ) -> Result<Option<SlotView>> {
        let settings = self.settings()?;
        let Some(slot) = lookup_slot(&settings, slot_key) else {
            return Ok(None);
        };
        let set = require_set(&settings, set_key)?;
        let selection = select_set(&self.selection()?, &format_date(date), &slot.id, &set.id);
        self.db.save_selection(&selection)?;
        self.slot_view(date, &slot.id)
    }

    /// Move to the next or previous recipe set, wrapping around.
    pub fn cycle_set(
        &self,
        date: NaiveDate,
        slot_key: &str,
        direction: Direction,
    ) -> Result<Option<SlotView>> {
        let settings = self.settings()?;
        let Some(slot) = lookup_slot(&settings, slot_key) else {
            return Ok(None);
        };
        let day = format_date(date);
        let selection = self.selection()?;
        let current = resolve_active_set_id(&settings, &day, &slot.id, &selection);
        let Some(next) = adjacent_set_id(&settings, current, direction) else {
            bail!("Need at least two recipe sets to switch between");
        };
        self.db
            .save_selection(&select_set(&selection, &day, &slot.id, next))?;
        self.slot_view(date, &slot.id)
    }

    /// Drop the per-day override so the default set applies again.
    pub fn clear_set_override(&self, date: NaiveDate, slot_key: &str) -> Result<Option<SlotView>> {
        let settings = self.settings()?;
        let Some(slot) = lookup_slot(&settings, slot_key) else {
            return Ok(None);
        };
        let selection = clear_selection(&self.selection()?, &format_date(date), &slot.id);
        self.db.save_selection(&selection)?;
        self.slot_view(date, &slot.id)
    }

    /// Mark a meal as saved. `Some(false)` if it already was.
    pub fn mark_saved(&self, date: NaiveDate, slot_key: &str) -> Result<Option<bool>> {
        let settings = self.settings()?;
        let Some(slot) = lookup_slot(&settings, slot_key) else {
            return Ok(None);
        };
        let day = format_date(date);
        let saved = self.saved_meals()?;
        if is_meal_saved(&saved, &day, &slot.id) {
            return Ok(Some(false));
        }
        self.db
            .save_saved_meals(&mark_meal_saved(&saved, &day, &slot.id))?;
        Ok(Some(true))
    }

    // --- Settings edits ---

    pub fn add_slot(&self, name: &str, time: &str) -> Result<MealSlot> {
        let id = new_id();
        let settings = self.edit_settings(|s| s.add_slot(&id, name, time))?;
        settings
            .slot(&id)
            .cloned()
            .context("Slot missing after insert")
    }

    pub fn remove_slot(&self, slot_key: &str) -> Result<MealSlot> {
        let mut removed = None;
        self.edit_settings(|s| {
            let slot = require_slot(s, slot_key)?.clone();
            let next = s.remove_slot(&slot.id)?;
            removed = Some(slot);
            Ok(next)
        })?;
        removed.context("Slot missing after removal")
    }

    pub fn rename_slot(&self, slot_key: &str, name: &str) -> Result<Settings> {
        self.edit_settings(|s| s.rename_slot(&require_slot(s, slot_key)?.id, name))
    }

    pub fn set_slot_time(&self, slot_key: &str, time: &str) -> Result<Settings> {
        self.edit_settings(|s| s.set_slot_time(&require_slot(s, slot_key)?.id, time))
    }

    pub fn add_recipe_set(&self, name: &str) -> Result<RecipeSet> {
        let id = new_id();
        let settings = self.edit_settings(|s| s.add_recipe_set(&id, name))?;
        settings
            .recipe_set(&id)
            .cloned()
            .context("Recipe set missing after insert")
    }

    pub fn remove_recipe_set(&self, set_key: &str) -> Result<Settings> {
        self.edit_settings(|s| s.remove_recipe_set(&require_set(s, set_key)?.id))
    }

    pub fn rename_recipe_set(&self, set_key: &str, name: &str) -> Result<Settings> {
        self.edit_settings(|s| s.rename_recipe_set(&require_set(s, set_key)?.id, name))
    }

    pub fn set_default_set(&self, set_key: &str) -> Result<Settings> {
        self.edit_settings(|s| s.set_default_set(&require_set(s, set_key)?.id))
    }

    pub fn add_item(
        &self,
        set_key: &str,
        slot_key: &str,
        name: &str,
        grams: u32,
    ) -> Result<MealItem> {
        let item = MealItem {
            id: new_id(),
            name: name.to_string(),
            grams,
        };
        let item_id = item.id.clone();
        let settings = self.edit_settings(|s| {
            let set_id = require_set(s, set_key)?.id.clone();
            s.add_item(&set_id, &require_slot(s, slot_key)?.id, item)
        })?;
        settings
            .recipe_sets
            .iter()
            .flat_map(|set| set.items_by_slot.values().flatten())
            .find(|i| i.id == item_id)
            .cloned()
            .context("Item missing after insert")
    }

    /// Resolve user-facing keys to `(set_id, slot_id, item_id)`.
    fn item_ids(
        settings: &Settings,
        set_key: &str,
        slot_key: &str,
        item_key: &str,
    ) -> Result<(String, String, String)> {
        let set = require_set(settings, set_key)?;
        let slot = require_slot(settings, slot_key)?;
        let items = set.items_for(&slot.id);
        let item = items
            .iter()
            .find(|i| i.id == item_key)
            .or_else(|| items.iter().find(|i| i.name == item_key))
            .with_context(|| {
                format!("Item '{item_key}' not found in {} / {}", set.name, slot.name)
            })?;
        Ok((set.id.clone(), slot.id.clone(), item.id.clone()))
    }

    pub fn remove_item(&self, set_key: &str, slot_key: &str, item_key: &str) -> Result<Settings> {
        self.edit_settings(|s| {
            let (set_id, slot_id, item_id) = Self::item_ids(s, set_key, slot_key, item_key)?;
            s.remove_item(&set_id, &slot_id, &item_id)
        })
    }

    pub fn update_item(
        &self,
        set_key: &str,
        slot_key: &str,
        item_key: &str,
        name: Option<&str>,
        grams: Option<u32>,
    ) -> Result<Settings> {
        if name.is_none() && grams.is_none() {
            bail!("Nothing to update. Provide a new name or grams");
        }
        self.edit_settings(|s| {
            let (set_id, slot_id, item_id) = Self::item_ids(s, set_key, slot_key, item_key)?;
            s.update_item(&set_id, &slot_id, &item_id, name, grams)
        })
    }

    // --- History, export, backup ---

    /// Logs grouped by date, newest first, limited to the `days` most recent dates.
    pub fn history(&self, days: Option<usize>) -> Result<Vec<DayLogs>> {
        let groups = group_by_date(&self.logs()?);
        Ok(match days {
            Some(n) => groups.into_iter().take(n).collect(),
            None => groups,
        })
    }

    pub fn export_csv(&self) -> Result<String> {
        logs_to_csv(&self.logs()?, &self.settings()?)
    }

    pub fn export_json(&self) -> Result<String> {
        logs_to_json(&self.logs()?)
    }

    pub fn export_backup(&self) -> Result<BackupData> {
        self.db.export_all()
    }

    pub fn import_backup(&self, data: &BackupData) -> Result<ImportSummary> {
        self.db.import_all(data)
    }

    // --- Reminders ---

    pub fn reminders(&self, now: NaiveDateTime) -> Result<Vec<Reminder>> {
        Ok(reminder_schedule(&self.settings()?, now))
    }

    pub fn due_reminders(&self, now: NaiveDateTime) -> Result<Vec<Reminder>> {
        Ok(due_reminders(&self.settings()?, now))
    }
}
