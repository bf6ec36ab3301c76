//! Which recipe set is active for a given date and slot.
//!
//! Fallback chain, first match wins:
//! 1. the per-day override in the [`Selection`], if it names an existing set;
//! 2. `Settings::default_set_id`, if it names an existing set;
//! 3. the first recipe set;
//! 4. [`DEFAULT_SET_ID`], even though no such set exists.
//!
//! The chain is evaluated per (date, slot) and never cached.

use std::collections::BTreeMap;

use crate::models::{DEFAULT_SET_ID, MealItem, RecipeSet, Selection, Settings};

#[must_use]
pub fn resolve_active_set_id<'a>(
    settings: &'a Settings,
    date: &str,
    slot_id: &str,
    selection: &'a Selection,
) -> &'a str {
    if let Some(id) = selection
        .get(date)
        .and_then(|day| day.get(slot_id))
        .filter(|id| settings.has_recipe_set(id))
    {
        return id;
    }
    default_set(settings).map_or(DEFAULT_SET_ID, |set| set.id.as_str())
}

/// The set used when there is no per-day override: steps 2 and 3 of the chain.
#[must_use]
pub fn default_set(settings: &Settings) -> Option<&RecipeSet> {
    settings
        .default_set_id
        .as_deref()
        .and_then(|id| settings.recipe_set(id))
        .or_else(|| settings.recipe_sets.first())
}

/// Planned items per slot from the default set, for reminders.
#[must_use]
pub fn default_items_by_slot(settings: &Settings) -> BTreeMap<&str, &[MealItem]> {
    let Some(set) = default_set(settings) else {
        return BTreeMap::new();
    };
    set.items_by_slot
        .iter()
        .map(|(slot_id, items)| (slot_id.as_str(), items.as_slice()))
        .collect()
}

/// Record an override for one date and slot, returning the new selection.
#[must_use]
pub fn select_set(selection: &Selection, date: &str, slot_id: &str, set_id: &str) -> Selection {
    let mut next = selection.clone();
    next.entry(date.to_string())
        .or_default()
        .insert(slot_id.to_string(), set_id.to_string());
    next
}

/// Drop the override for one date and slot so the default chain applies again.
#[must_use]
pub fn clear_selection(selection: &Selection, date: &str, slot_id: &str) -> Selection {
    let mut next = selection.clone();
    if let Some(day) = next.get_mut(date) {
        day.remove(slot_id);
        if day.is_empty() {
            next.remove(date);
        }
    }
    next
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// The recipe set after (or before) `current`, wrapping around.
///
/// Returns `None` when there are fewer than two sets. An unknown `current` starts from the
/// first set.
#[must_use]
pub fn adjacent_set_id<'a>(
    settings: &'a Settings,
    current: &str,
    direction: Direction,
) -> Option<&'a str> {
    let sets = &settings.recipe_sets;
    if sets.len() < 2 {
        return None;
    }
    let last = sets.len() - 1;
    let idx = match (sets.iter().position(|s| s.id == current), direction) {
        (None, _) => 0,
        (Some(i), Direction::Next) => {
            if i >= last {
                0
            } else {
                i + 1
            }
        }
        (Some(i), Direction::Previous) => {
            if i == 0 {
                last
            } else {
                i - 1
            }
        }
    };
    Some(sets[idx].id.as_str())
}
