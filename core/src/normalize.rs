//! Repair raw persisted settings into a valid [`Settings`].
//!
//! Shapes, tried in order:
//! 1. current: `slots` and `recipeSets` arrays (unreadable sets or items are dropped one by one);
//! 2. legacy single menu: `slots` plus a flat `itemsBySlot` object;
//! 3. anything else: built-in defaults.
//!
//! Whatever the shape, every recipe set ends up with exactly one `itemsBySlot` key per slot.

use std::collections::BTreeMap;

use log::warn;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::models::{
    DEFAULT_SET_ID, DEFAULT_SET_NAME, MealItem, MealSlot, RecipeSet, Settings, default_recipe_set,
};

/// Never fails: unusable input becomes the built-in defaults.
#[must_use]
pub fn normalize_settings(raw: &Value) -> Settings {
    let settings = current_shape(raw)
        .or_else(|| legacy_shape(raw))
        .unwrap_or_else(|| {
            if !raw.is_null() {
                warn!("Unrecognized settings payload, falling back to built-in defaults");
            }
            Settings::default()
        });
    align_items_to_slots(settings)
}

fn field<T: DeserializeOwned>(raw: &Value, key: &str) -> Option<T> {
    let value = raw.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Ignoring malformed settings field '{key}': {e}");
            None
        }
    }
}

fn item_list(set_id: &str, slot_id: &str, raw: &Value) -> Vec<MealItem> {
    let Some(items) = raw.as_array() else {
        warn!("Recipe set '{set_id}': items for slot '{slot_id}' are not a list, dropping them");
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Recipe set '{set_id}': dropping unreadable item in slot '{slot_id}': {e}");
                None
            }
        })
        .collect()
}

fn recipe_set(raw: &Value) -> Option<RecipeSet> {
    let (Some(id), Some(name)) = (
        raw.get("id").and_then(Value::as_str),
        raw.get("name").and_then(Value::as_str),
    ) else {
        warn!("Dropping recipe set without a string id and name: {raw}");
        return None;
    };
    let items_by_slot = raw
        .get("itemsBySlot")
        .and_then(Value::as_object)
        .map(|by_slot| {
            by_slot
                .iter()
                .map(|(slot_id, items)| (slot_id.clone(), item_list(id, slot_id, items)))
                .collect()
        })
        .unwrap_or_default();
    Some(RecipeSet {
        id: id.to_string(),
        name: name.to_string(),
        items_by_slot,
    })
}

fn current_shape(raw: &Value) -> Option<Settings> {
    let slots: Vec<MealSlot> = field(raw, "slots")?;
    let recipe_sets: Vec<RecipeSet> = raw
        .get("recipeSets")?
        .as_array()?
        .iter()
        .filter_map(recipe_set)
        .collect();

    if recipe_sets.is_empty() {
        return Some(Settings {
            slots,
            recipe_sets: vec![default_recipe_set()],
            default_set_id: Some(DEFAULT_SET_ID.to_string()),
        });
    }

    let default_set_id = raw
        .get("defaultSetId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| recipe_sets.first().map(|s| s.id.clone()));

    Some(Settings {
        slots,
        recipe_sets,
        default_set_id,
    })
}

fn legacy_shape(raw: &Value) -> Option<Settings> {
    let slots: Vec<MealSlot> = field(raw, "slots")?;
    let items_by_slot: BTreeMap<String, Vec<MealItem>> = field(raw, "itemsBySlot")?;
    Some(Settings {
        slots,
        recipe_sets: vec![RecipeSet {
            id: DEFAULT_SET_ID.to_string(),
            name: DEFAULT_SET_NAME.to_string(),
            items_by_slot,
        }],
        default_set_id: Some(DEFAULT_SET_ID.to_string()),
    })
}

/// Give every recipe set one item list per current slot, dropping lists of removed slots.
#[must_use]
pub fn align_items_to_slots(settings: Settings) -> Settings {
    let Settings {
        slots,
        recipe_sets,
        default_set_id,
    } = settings;
    let recipe_sets = recipe_sets
        .into_iter()
        .map(|mut set| {
            set.items_by_slot = slots
                .iter()
                .map(|slot| {
                    let items = set.items_by_slot.remove(&slot.id).unwrap_or_default();
                    (slot.id.clone(), items)
                })
                .collect();
            set
        })
        .collect();
    Settings {
        slots,
        recipe_sets,
        default_set_id,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn renormalize(settings: &Settings) -> Settings {
        normalize_settings(&serde_json::to_value(settings).unwrap())
    }

    #[test]
    fn test_well_formed_settings_kept() {
        let raw = json!({
            "slots": [{"id": "lunch", "name": "午餐", "time": "13:00"}],
            "recipeSets": [{"id": "A", "name": "减脂", "itemsBySlot": {
                "lunch": [{"id": "l1", "name": "牛肉", "grams": 50}]
            }}],
            "defaultSetId": "A"
        });
        let settings = normalize_settings(&raw);
        assert_eq!(settings.slots.len(), 1);
        assert_eq!(settings.recipe_sets.len(), 1);
        assert_eq!(settings.default_set_id.as_deref(), Some("A"));
        assert_eq!(settings.recipe_sets[0].items_for("lunch")[0].grams, 50);
    }

    #[test]
    fn test_missing_default_uses_first_set() {
        let raw = json!({
            "slots": [],
            "recipeSets": [{"id": "B", "name": "B", "itemsBySlot": {}}, {"id": "C", "name": "C"}],
            "defaultSetId": null
        });
        let settings = normalize_settings(&raw);
        assert_eq!(settings.default_set_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_stale_default_is_kept_as_given() {
        let raw = json!({
            "slots": [],
            "recipeSets": [{"id": "B", "name": "B", "itemsBySlot": {}}],
            "defaultSetId": "gone"
        });
        assert_eq!(
            normalize_settings(&raw).default_set_id.as_deref(),
            Some("gone")
        );
    }

    #[test]
    fn test_empty_recipe_sets_substituted() {
        let raw = json!({
            "slots": [{"id": "lunch", "name": "午餐", "time": "13:00"},
                      {"id": "late", "name": "夜宵", "time": "22:00"}],
            "recipeSets": [],
            "defaultSetId": "whatever"
        });
        let settings = normalize_settings(&raw);
        assert_eq!(settings.recipe_sets.len(), 1);
        assert_eq!(settings.recipe_sets[0].id, DEFAULT_SET_ID);
        assert_eq!(settings.default_set_id.as_deref(), Some(DEFAULT_SET_ID));
        let keys: Vec<&String> = settings.recipe_sets[0].items_by_slot.keys().collect();
        assert_eq!(keys, vec!["late", "lunch"]);
        assert_eq!(settings.recipe_sets[0].items_for("lunch").len(), 2);
        assert!(settings.recipe_sets[0].items_for("late").is_empty());
    }

    #[test]
    fn test_legacy_single_menu() {
        let raw = json!({
            "slots": [{"id": "lunch", "name": "午餐", "time": "13:00"}],
            "itemsBySlot": {"lunch": [{"id": "l1", "name": "牛肉", "grams": 50}]}
        });
        let settings = normalize_settings(&raw);
        assert_eq!(settings.recipe_sets.len(), 1);
        let set = &settings.recipe_sets[0];
        assert_eq!(set.id, DEFAULT_SET_ID);
        assert_eq!(set.name, DEFAULT_SET_NAME);
        assert_eq!(set.items_for("lunch")[0].id, "l1");
        assert_eq!(settings.default_set_id.as_deref(), Some(DEFAULT_SET_ID));
    }

    #[test]
    fn test_unrecognized_input_gets_defaults() {
        for raw in [
            json!(null),
            json!({}),
            json!("settings"),
            json!({"slots": "nope"}),
            json!({"recipeSets": []}),
            json!({"slots": [{"id": 3}], "recipeSets": []}),
        ] {
            assert_eq!(normalize_settings(&raw), Settings::default(), "{raw}");
        }
    }

    #[test]
    fn test_malformed_recipe_sets_fall_to_legacy_then_defaults() {
        let raw = json!({
            "slots": [{"id": "lunch", "name": "午餐", "time": "13:00"}],
            "recipeSets": "broken",
            "itemsBySlot": {"lunch": []}
        });
        let settings = normalize_settings(&raw);
        assert_eq!(settings.recipe_sets[0].id, DEFAULT_SET_ID);
        assert_eq!(settings.slots.len(), 1);
    }

    #[test]
    fn test_fractional_and_negative_grams_keep_user_settings() {
        let raw = json!({
            "slots": [{"id": "lunch", "name": "午餐", "time": "13:00"},
                      {"id": "late", "name": "夜宵", "time": "22:00"}],
            "recipeSets": [
                {"id": "A", "name": "A", "itemsBySlot": {
                    "lunch": [{"id": "l1", "name": "牛肉", "grams": 50.5},
                              {"id": "l2", "name": "蔬菜", "grams": -5}]
                }},
                {"id": "B", "name": "B", "itemsBySlot": {}}
            ],
            "defaultSetId": "B"
        });
        let settings = normalize_settings(&raw);
        assert_eq!(settings.slots.len(), 2);
        let ids: Vec<&str> = settings.recipe_sets.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(settings.default_set_id.as_deref(), Some("B"));
        let lunch = settings.recipe_sets[0].items_for("lunch");
        assert_eq!(lunch[0].grams, 51);
        assert_eq!(lunch[1].grams, 0);
    }

    #[test]
    fn test_unreadable_sets_and_items_dropped_individually() {
        let raw = json!({
            "slots": [{"id": "lunch", "name": "午餐", "time": "13:00"}],
            "recipeSets": [
                {"id": 7, "name": "bad"},
                "not a set",
                {"id": "A", "name": "A", "itemsBySlot": {
                    "lunch": [{"id": "l1", "name": "牛肉", "grams": 50}, {"name": 3}],
                    "dinner": "nope"
                }}
            ],
            "defaultSetId": "A"
        });
        let settings = normalize_settings(&raw);
        assert_eq!(settings.recipe_sets.len(), 1);
        let set = &settings.recipe_sets[0];
        assert_eq!(set.id, "A");
        assert_eq!(set.items_for("lunch").len(), 1);
        assert_eq!(set.items_for("lunch")[0].id, "l1");
    }

    #[test]
    fn test_missing_slot_keys_are_filled() {
        let raw = json!({
            "slots": [{"id": "lunch", "name": "午餐", "time": "13:00"},
                      {"id": "dinner", "name": "晚餐", "time": "18:00"}],
            "recipeSets": [{"id": "A", "name": "A", "itemsBySlot": {"lunch": []}}],
            "defaultSetId": "A"
        });
        let settings = normalize_settings(&raw);
        assert!(
            settings.recipe_sets[0]
                .items_by_slot
                .contains_key("dinner")
        );
    }

    #[test]
    fn test_slot_deletion_cascades_on_renormalize() {
        let mut settings = Settings::default();
        settings.slots.retain(|s| s.id != "snack");
        let settings = renormalize(&settings);
        for set in &settings.recipe_sets {
            assert!(!set.items_by_slot.contains_key("snack"));
            assert_eq!(set.items_by_slot.len(), 3);
        }
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            json!({
                "slots": [{"id": "lunch", "name": "午餐", "time": "13:00"}],
                "recipeSets": [{"id": "A", "name": "A", "itemsBySlot": {
                    "lunch": [{"id": "l1", "name": "牛肉", "grams": 50}],
                    "ghost": [{"id": "g1", "name": "鬼", "grams": 1}]
                }}],
                "defaultSetId": null
            }),
            json!({"slots": [], "recipeSets": []}),
            json!({"slots": [{"id": "a", "name": "A", "time": "08:00"}], "itemsBySlot": {}}),
            json!(42),
        ];
        for raw in inputs {
            let once = normalize_settings(&raw);
            let twice = renormalize(&once);
            assert_eq!(once, twice, "{raw}");
        }
    }
}
