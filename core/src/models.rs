use std::collections::BTreeMap;

use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Common slot names offered when creating or renaming a slot. Free-form names are allowed.
pub const SLOT_NAME_SUGGESTIONS: &[&str] = &["早餐", "午餐", "晚餐", "下午加餐", "夜宵"];

/// Id of the built-in recipe set, also the last-resort active set id.
pub const DEFAULT_SET_ID: &str = "default";
pub const DEFAULT_SET_NAME: &str = "默认方案";
/// Label shown for a slot whose active set id does not resolve to any set.
pub const FALLBACK_SET_NAME: &str = "默认";

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// A named time-of-day meal window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealSlot {
    pub id: String,
    pub name: String,
    /// "HH:MM", 24-hour, device local time.
    pub time: String,
}

/// A planned food inside one recipe set's slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealItem {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_grams")]
    pub grams: u32,
}

/// An alternative menu. `items_by_slot` is keyed by slot id and holds one entry per slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items_by_slot: BTreeMap<String, Vec<MealItem>>,
}

impl RecipeSet {
    /// Planned items for a slot, empty when the slot key is missing.
    #[must_use]
    pub fn items_for(&self, slot_id: &str) -> &[MealItem] {
        self.items_by_slot.get(slot_id).map_or(&[], Vec::as_slice)
    }
}

/// What was actually done for one item on one date and slot.
///
/// `item_name` and `planned_grams` are copied from the planned item at log time, since
/// custom entries have no planned item to look them up from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub date: String,
    pub slot_id: String,
    pub item_id: String,
    #[serde(default)]
    pub item_name: String,
    #[serde(default, deserialize_with = "deserialize_grams")]
    pub planned_grams: u32,
    /// `None` until the user enters an amount.
    #[serde(default, deserialize_with = "deserialize_actual_grams")]
    pub actual_grams: Option<u32>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub is_custom: bool,
}

impl LogEntry {
    #[must_use]
    pub fn is_for(&self, date: &str, slot_id: &str) -> bool {
        self.date == date && self.slot_id == slot_id
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_grams(g: f64) -> u32 {
    g.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

// Stored payloads may carry fractional or negative amounts; round and clamp at 0.
fn deserialize_grams<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|g| g.is_finite()).map_or(0, round_grams))
}

// Older payloads store "not entered" as a negative number.
fn deserialize_actual_grams<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|g| g.is_finite() && *g >= 0.0)
        .map(round_grams))
}

/// Root configuration aggregate. Replaced as a whole, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub slots: Vec<MealSlot>,
    pub recipe_sets: Vec<RecipeSet>,
    pub default_set_id: Option<String>,
}

impl Settings {
    #[must_use]
    pub fn slot(&self, slot_id: &str) -> Option<&MealSlot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }

    #[must_use]
    pub fn recipe_set(&self, set_id: &str) -> Option<&RecipeSet> {
        self.recipe_sets.iter().find(|s| s.id == set_id)
    }

    #[must_use]
    pub fn has_recipe_set(&self, set_id: &str) -> bool {
        self.recipe_set(set_id).is_some()
    }

    /// Display name of a slot, or the id itself when the slot no longer exists.
    #[must_use]
    pub fn slot_name<'a>(&'a self, slot_id: &'a str) -> &'a str {
        self.slot(slot_id).map_or(slot_id, |s| s.name.as_str())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slots: default_slots(),
            recipe_sets: vec![default_recipe_set()],
            default_set_id: Some(DEFAULT_SET_ID.to_string()),
        }
    }
}

/// Per-day recipe set overrides: date -> slot id -> recipe set id.
pub type Selection = BTreeMap<String, BTreeMap<String, String>>;

/// Slots the user marked as saved: date -> slot ids.
pub type SavedMeals = BTreeMap<String, Vec<String>>;

fn slot(id: &str, name: &str, time: &str) -> MealSlot {
    MealSlot {
        id: id.to_string(),
        name: name.to_string(),
        time: time.to_string(),
    }
}

fn item(id: &str, name: &str, grams: u32) -> MealItem {
    MealItem {
        id: id.to_string(),
        name: name.to_string(),
        grams,
    }
}

#[must_use]
pub fn default_slots() -> Vec<MealSlot> {
    vec![
        slot("breakfast", "早餐", "10:00"),
        slot("lunch", "午餐", "13:00"),
        slot("snack", "下午加餐", "15:00"),
        slot("dinner", "晚餐", "18:00"),
    ]
}

#[must_use]
pub fn default_recipe_set() -> RecipeSet {
    let items_by_slot = BTreeMap::from([
        ("breakfast".to_string(), vec![item("b1", "黑咖啡", 0)]),
        (
            "lunch".to_string(),
            vec![item("l1", "牛肉", 50), item("l2", "蔬菜", 100)],
        ),
        ("snack".to_string(), vec![item("s1", "鸡胸肉", 50)]),
        ("dinner".to_string(), vec![item("d1", "豆皮", 100)]),
    ]);
    RecipeSet {
        id: DEFAULT_SET_ID.to_string(),
        name: DEFAULT_SET_NAME.to_string(),
        items_by_slot,
    }
}

/// Fresh unique id for slots, sets, items and log entries.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| anyhow::anyhow!("Invalid date '{date}'. Must be YYYY-MM-DD"))
}

#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a slot time. Accepts "H:MM" and "HH:MM" in 24-hour form.
pub fn parse_time(time: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
        .map_err(|_| anyhow::anyhow!("Invalid time '{time}'. Must be HH:MM"))
}

/// Validate and canonicalize a slot time to zero-padded "HH:MM".
pub fn validate_time(time: &str) -> Result<String> {
    Ok(parse_time(time)?.format(TIME_FORMAT).to_string())
}

pub fn validate_name(kind: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("{kind} name must not be empty");
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_cover_every_slot() {
        let settings = Settings::default();
        assert_eq!(settings.slots.len(), 4);
        assert_eq!(settings.default_set_id.as_deref(), Some(DEFAULT_SET_ID));
        let set = &settings.recipe_sets[0];
        for slot in &settings.slots {
            assert!(set.items_by_slot.contains_key(&slot.id), "{}", slot.id);
        }
        assert_eq!(set.items_for("lunch").len(), 2);
        assert_eq!(set.items_for("breakfast")[0].grams, 0);
    }

    #[test]
    fn test_items_for_missing_slot_is_empty() {
        let set = default_recipe_set();
        assert!(set.items_for("midnight").is_empty());
    }

    #[test]
    fn test_settings_serialize_camel_case() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert!(json.get("recipeSets").is_some());
        assert!(json.get("defaultSetId").is_some());
        assert!(json["recipeSets"][0].get("itemsBySlot").is_some());
    }

    #[test]
    fn test_log_entry_negative_actual_grams_is_unset() {
        let json = r#"{"id":"x1","date":"2024-01-01","slotId":"lunch","itemId":"l1",
            "itemName":"牛肉","plannedGrams":50,"actualGrams":-1,"checked":false,"isCustom":false}"#;
        let entry: LogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.actual_grams, None);
        assert_eq!(entry.planned_grams, 50);
    }

    #[test]
    fn test_log_entry_actual_grams_round_trip_shape() {
        let json = r#"{"id":"x1","date":"2024-01-01","slotId":"lunch","itemId":"l1",
            "itemName":"牛肉","plannedGrams":50,"actualGrams":40,"checked":true,"isCustom":false}"#;
        let entry: LogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.actual_grams, Some(40));
        let out = serde_json::to_value(&entry).unwrap();
        assert_eq!(out["actualGrams"], 40);
        assert_eq!(out["slotId"], "lunch");
        assert_eq!(out["isCustom"], false);
    }

    #[test]
    fn test_log_entry_fractional_planned_grams() {
        let json = r#"{"id":"x1","date":"2024-01-01","slotId":"lunch","itemId":"l1",
            "itemName":"牛肉","plannedGrams":12.5,"actualGrams":7.4}"#;
        let entry: LogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.planned_grams, 13);
        assert_eq!(entry.actual_grams, Some(7));
    }

    #[test]
    fn test_meal_item_lenient_grams() {
        let parse = |json: &str| serde_json::from_str::<MealItem>(json).unwrap().grams;
        assert_eq!(parse(r#"{"id":"a","name":"米饭","grams":50.4}"#), 50);
        assert_eq!(parse(r#"{"id":"a","name":"米饭","grams":-5}"#), 0);
        assert_eq!(parse(r#"{"id":"a","name":"米饭","grams":null}"#), 0);
        assert_eq!(parse(r#"{"id":"a","name":"米饭"}"#), 0);
    }

    #[test]
    fn test_log_entry_missing_actual_grams() {
        let json = r#"{"id":"x1","date":"2024-01-01","slotId":"lunch","itemId":"l1"}"#;
        let entry: LogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.actual_grams, None);
        assert!(!entry.checked);
        assert!(!entry.is_custom);
    }

    #[test]
    fn test_slot_name_falls_back_to_id() {
        let settings = Settings::default();
        assert_eq!(settings.slot_name("lunch"), "午餐");
        assert_eq!(settings.slot_name("gone"), "gone");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-01-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("today").is_err());
    }

    #[test]
    fn test_validate_time() {
        assert_eq!(validate_time("13:00").unwrap(), "13:00");
        assert_eq!(validate_time("7:05").unwrap(), "07:05");
        assert!(validate_time("24:00").is_err());
        assert!(validate_time("12:60").is_err());
        assert!(validate_time("noon").is_err());
        assert!(validate_time("12").is_err());
        assert!(validate_time(" 08:30 ").is_ok());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("Slot", "  夜宵 ").unwrap(), "夜宵");
        assert!(validate_name("Slot", "   ").is_err());
    }

    #[test]
    fn test_new_id_unique() {
        assert_ne!(new_id(), new_id());
    }
}
