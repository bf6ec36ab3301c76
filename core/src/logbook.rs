//! Keyed replace of log entries, and the user intents that produce them.
//!
//! The log collection is a plain ordered list. Every operation here takes the current list and
//! returns a new one; nothing is patched in place.

use log::warn;

use crate::models::{LogEntry, SavedMeals, new_id};
use crate::plan::{PlanEntry, SlotView};

/// A candidate log entry. `None` fields are carried forward from the matched entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogUpsert {
    pub date: String,
    pub slot_id: String,
    pub item_id: Option<String>,
    pub id: Option<String>,
    pub item_name: Option<String>,
    pub planned_grams: Option<u32>,
    /// `Some(None)` explicitly clears the amount.
    pub actual_grams: Option<Option<u32>>,
    pub checked: Option<bool>,
    pub is_custom: Option<bool>,
}

impl LogUpsert {
    #[must_use]
    pub fn new(date: &str, slot_id: &str) -> Self {
        Self {
            date: date.to_string(),
            slot_id: slot_id.to_string(),
            ..Self::default()
        }
    }

    /// An ad-hoc food. Gets its own item id so it never collides with a planned item.
    #[must_use]
    pub fn custom(date: &str, slot_id: &str, name: &str, grams: u32) -> Self {
        Self {
            item_id: Some(new_id()),
            item_name: Some(name.to_string()),
            planned_grams: Some(grams),
            actual_grams: Some(Some(grams)),
            checked: Some(false),
            is_custom: Some(true),
            ..Self::new(date, slot_id)
        }
    }

    fn matches(&self, log: &LogEntry) -> bool {
        if !log.is_for(&self.date, &self.slot_id) {
            return false;
        }
        let by_item = self.item_id.as_deref().is_some_and(|i| i == log.item_id);
        let by_id = self.id.as_deref().is_some_and(|i| i == log.id);
        by_item || by_id
    }

    fn merge(self, existing: Option<&LogEntry>) -> LogEntry {
        LogEntry {
            id: self
                .id
                .or_else(|| existing.map(|e| e.id.clone()))
                .unwrap_or_else(new_id),
            item_id: self
                .item_id
                .or_else(|| existing.map(|e| e.item_id.clone()))
                .unwrap_or_else(new_id),
            item_name: self
                .item_name
                .or_else(|| existing.map(|e| e.item_name.clone()))
                .unwrap_or_default(),
            planned_grams: self
                .planned_grams
                .or_else(|| existing.map(|e| e.planned_grams))
                .unwrap_or(0),
            actual_grams: self
                .actual_grams
                .unwrap_or_else(|| existing.and_then(|e| e.actual_grams)),
            checked: self
                .checked
                .or_else(|| existing.map(|e| e.checked))
                .unwrap_or(false),
            is_custom: self
                .is_custom
                .or_else(|| existing.map(|e| e.is_custom))
                .unwrap_or(false),
            date: self.date,
            slot_id: self.slot_id,
        }
    }
}

/// Replace the entry matching `candidate`, or append a new one.
///
/// An existing entry matches when date and slot are equal and either the candidate's
/// `item_id` or its `id` is given and equal. The merged entry goes to the end of the list.
/// More than one match means the one-log-per-item invariant was already broken: all matches
/// are superseded and the first one supplies carried-forward fields.
#[must_use]
pub fn upsert_log(logs: &[LogEntry], candidate: LogUpsert) -> Vec<LogEntry> {
    let matched: Vec<&LogEntry> = logs.iter().filter(|l| candidate.matches(l)).collect();
    if matched.len() > 1 {
        let ids: Vec<&str> = matched.iter().map(|l| l.id.as_str()).collect();
        warn!(
            "{} log entries match {}:{} (item {:?}, id {:?}): {}",
            matched.len(),
            candidate.date,
            candidate.slot_id,
            candidate.item_id,
            candidate.id,
            ids.join(", ")
        );
    }
    let existing = matched.first().copied();

    let mut next: Vec<LogEntry> = logs
        .iter()
        .filter(|l| !candidate.matches(l))
        .cloned()
        .collect();
    next.push(candidate.merge(existing));
    next
}

/// Apply several candidates in order.
#[must_use]
pub fn upsert_logs(logs: &[LogEntry], candidates: Vec<LogUpsert>) -> Vec<LogEntry> {
    candidates
        .into_iter()
        .fold(logs.to_vec(), |acc, c| upsert_log(&acc, c))
}

/// Remove the entry with `id`. Returns `None` if nothing was removed.
#[must_use]
pub fn remove_log(logs: &[LogEntry], id: &str) -> Option<Vec<LogEntry>> {
    if !logs.iter().any(|l| l.id == id) {
        return None;
    }
    Some(logs.iter().filter(|l| l.id != id).cloned().collect())
}

impl PlanEntry {
    /// Candidate describing this entry with everything the view knows about it.
    fn to_upsert(&self, date: &str, slot_id: &str) -> LogUpsert {
        let log = self.log();
        LogUpsert {
            item_id: Some(self.item_id().to_string()),
            id: log.map(|l| l.id.clone()),
            item_name: Some(self.name().to_string()),
            planned_grams: Some(self.planned_grams()),
            is_custom: Some(self.is_custom()),
            ..LogUpsert::new(date, slot_id)
        }
    }

    /// Flip the checked state. An untouched entry gets its planned grams as the actual amount.
    #[must_use]
    pub fn toggle(&self, date: &str, slot_id: &str) -> LogUpsert {
        self.set_checked(date, slot_id, !self.is_checked())
    }

    #[must_use]
    pub fn set_checked(&self, date: &str, slot_id: &str, checked: bool) -> LogUpsert {
        LogUpsert {
            actual_grams: Some(Some(self.effective_grams())),
            checked: Some(checked),
            ..self.to_upsert(date, slot_id)
        }
    }

    #[must_use]
    pub fn with_actual_grams(&self, date: &str, slot_id: &str, grams: u32) -> LogUpsert {
        LogUpsert {
            actual_grams: Some(Some(grams)),
            checked: Some(self.is_checked()),
            ..self.to_upsert(date, slot_id)
        }
    }
}

/// Check every entry of a slot, or uncheck them all when all are already checked.
#[must_use]
pub fn complete_all(view: &SlotView, date: &str) -> Vec<LogUpsert> {
    let target = !view.is_complete();
    view.entries
        .iter()
        .map(|e| e.set_checked(date, &view.slot.id, target))
        .collect()
}

/// Mark a slot as saved for a date. Marking twice is a no-op.
#[must_use]
pub fn mark_meal_saved(saved: &SavedMeals, date: &str, slot_id: &str) -> SavedMeals {
    let mut next = saved.clone();
    let slots = next.entry(date.to_string()).or_default();
    if !slots.iter().any(|s| s == slot_id) {
        slots.push(slot_id.to_string());
    }
    next
}

#[must_use]
pub fn is_meal_saved(saved: &SavedMeals, date: &str, slot_id: &str) -> bool {
    saved
        .get(date)
        .is_some_and(|slots| slots.iter().any(|s| s == slot_id))
}
