//! Daily plan resolution: planned items of the active recipe set merged with the day's logs.

use serde::Serialize;

use crate::models::{FALLBACK_SET_NAME, LogEntry, MealItem, MealSlot, Selection, Settings};
use crate::selection::resolve_active_set_id;

/// One line of a slot's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlanEntry {
    /// A planned item, with its log once the user has touched it.
    Planned {
        item: MealItem,
        log: Option<LogEntry>,
    },
    /// An ad-hoc food logged outside the menu.
    Custom { log: LogEntry },
}

impl PlanEntry {
    #[must_use]
    pub fn log(&self) -> Option<&LogEntry> {
        match self {
            Self::Planned { log, .. } => log.as_ref(),
            Self::Custom { log } => Some(log),
        }
    }

    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }

    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.log().is_some_and(|l| l.checked)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Planned { item, .. } => &item.name,
            Self::Custom { log } => &log.item_name,
        }
    }

    /// Planned item id, or the log's own item id for custom entries.
    #[must_use]
    pub fn item_id(&self) -> &str {
        match self {
            Self::Planned { item, .. } => &item.id,
            Self::Custom { log } => &log.item_id,
        }
    }

    #[must_use]
    pub fn planned_grams(&self) -> u32 {
        match self {
            Self::Planned { item, .. } => item.grams,
            Self::Custom { log } => log.planned_grams,
        }
    }

    #[must_use]
    pub fn actual_grams(&self) -> Option<u32> {
        self.log().and_then(|l| l.actual_grams)
    }

    /// Grams to display: the logged amount, else the planned amount.
    #[must_use]
    pub fn effective_grams(&self) -> u32 {
        self.actual_grams().unwrap_or_else(|| self.planned_grams())
    }
}

/// Resolved plan for one slot on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub slot: MealSlot,
    pub entries: Vec<PlanEntry>,
    pub active_set_id: String,
    pub active_set_name: String,
}

impl SlotView {
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_checked()).count()
    }

    /// True when the slot has entries and every one is checked.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(PlanEntry::is_checked)
    }
}

/// Checked entries over all entries of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayProgress {
    pub completed: usize,
    pub total: usize,
}

impl DayProgress {
    #[must_use]
    pub fn from_views(views: &[SlotView]) -> Self {
        views.iter().fold(
            Self {
                completed: 0,
                total: 0,
            },
            |acc, v| Self {
                completed: acc.completed + v.completed_count(),
                total: acc.total + v.entries.len(),
            },
        )
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Build the plan for `date`, one view per slot in settings order.
///
/// Pure and deterministic. Missing recipe sets or slot keys yield empty entry lists; logs for
/// other dates are ignored. Planned entries come first, in menu order, followed by custom
/// entries in log collection order.
#[must_use]
pub fn resolve_plan(
    settings: &Settings,
    logs: &[LogEntry],
    date: &str,
    selection: &Selection,
) -> Vec<SlotView> {
    let day_logs: Vec<&LogEntry> = logs.iter().filter(|l| l.date == date).collect();
    settings
        .slots
        .iter()
        .map(|slot| build_slot_view(settings, &day_logs, date, slot, selection))
        .collect()
}

/// Same as [`resolve_plan`] for a single slot. `None` if the slot does not exist.
#[must_use]
pub fn resolve_slot(
    settings: &Settings,
    logs: &[LogEntry],
    date: &str,
    slot_id: &str,
    selection: &Selection,
) -> Option<SlotView> {
    let slot = settings.slot(slot_id)?;
    let day_logs: Vec<&LogEntry> = logs.iter().filter(|l| l.date == date).collect();
    Some(build_slot_view(settings, &day_logs, date, slot, selection))
}

fn build_slot_view(
    settings: &Settings,
    day_logs: &[&LogEntry],
    date: &str,
    slot: &MealSlot,
    selection: &Selection,
) -> SlotView {
    let active_set_id = resolve_active_set_id(settings, date, &slot.id, selection);
    let active_set = settings.recipe_set(active_set_id);
    let planned = active_set.map_or(&[][..], |set| set.items_for(&slot.id));

    let slot_logs: Vec<&LogEntry> = day_logs
        .iter()
        .copied()
        .filter(|l| l.slot_id == slot.id)
        .collect();

    let mut entries: Vec<PlanEntry> = planned
        .iter()
        .map(|item| PlanEntry::Planned {
            item: item.clone(),
            log: slot_logs
                .iter()
                .find(|l| !l.is_custom && l.item_id == item.id)
                .map(|l| (*l).clone()),
        })
        .collect();

    entries.extend(
        slot_logs
            .iter()
            .filter(|l| l.is_custom)
            .map(|l| PlanEntry::Custom { log: (*l).clone() }),
    );

    SlotView {
        slot: slot.clone(),
        entries,
        active_set_id: active_set_id.to_string(),
        active_set_name: active_set.map_or(FALLBACK_SET_NAME, |s| s.name.as_str()).to_string(),
    }
}
