//! Meal reminder schedule derived from the slots and the default recipe set.
//!
//! Delivering notifications is up to the caller; this module only says when and what.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use log::warn;
use serde::Serialize;

use crate::models::{MealItem, MealSlot, Settings, parse_time};
use crate::selection::default_items_by_slot;

pub const REMINDER_TITLE: &str = "食谱小助手";
/// How close to the slot time a polling check still fires, in minutes.
pub const DUE_TOLERANCE_MINUTES: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// 1-based position of the slot in settings order.
    pub id: usize,
    pub slot_id: String,
    pub title: String,
    pub body: String,
    pub at: NaiveDateTime,
}

/// Today at `time` if that is still ahead of `now`, otherwise tomorrow.
#[must_use]
pub fn next_fire_at(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(time);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

#[must_use]
pub fn reminder_body(slot: &MealSlot, items: &[MealItem]) -> String {
    if items.is_empty() {
        format!("该吃「{}」啦", slot.name)
    } else {
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        format!("该吃「{}」啦：{}", slot.name, names.join("、"))
    }
}

fn reminders_where(
    settings: &Settings,
    mut fire_at: impl FnMut(NaiveTime) -> Option<NaiveDateTime>,
) -> Vec<Reminder> {
    let items_by_slot = default_items_by_slot(settings);
    settings
        .slots
        .iter()
        .enumerate()
        .filter_map(|(idx, slot)| {
            let time = match parse_time(&slot.time) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Skipping reminder for slot '{}': {e}", slot.id);
                    return None;
                }
            };
            let at = fire_at(time)?;
            let items = items_by_slot.get(slot.id.as_str()).copied().unwrap_or(&[]);
            Some(Reminder {
                id: idx + 1,
                slot_id: slot.id.clone(),
                title: REMINDER_TITLE.to_string(),
                body: reminder_body(slot, items),
                at,
            })
        })
        .collect()
}

/// One repeating daily reminder per slot, each at its next occurrence after `now`.
#[must_use]
pub fn reminder_schedule(settings: &Settings, now: NaiveDateTime) -> Vec<Reminder> {
    reminders_where(settings, |time| Some(next_fire_at(time, now)))
}

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Slots whose time is within [`DUE_TOLERANCE_MINUTES`] of `now`, for minute-by-minute polling.
/// The window wraps around midnight.
#[must_use]
pub fn due_reminders(settings: &Settings, now: NaiveDateTime) -> Vec<Reminder> {
    let now_minutes = i64::from(now.hour() * 60 + now.minute());
    reminders_where(settings, |time| {
        let slot_minutes = i64::from(time.hour() * 60 + time.minute());
        // Signed distance from now to the slot, in -720..720.
        let ahead = (slot_minutes - now_minutes + MINUTES_PER_DAY / 2).rem_euclid(MINUTES_PER_DAY)
            - MINUTES_PER_DAY / 2;
        let day_shift = (now_minutes + ahead).div_euclid(MINUTES_PER_DAY);
        (ahead.abs() <= DUE_TOLERANCE_MINUTES)
            .then(|| now.date().and_time(time) + Duration::days(day_shift))
    })
}
