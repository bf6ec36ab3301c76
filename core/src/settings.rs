//! Edits on [`Settings`]. Each returns a new value and keeps every recipe set keyed by exactly
//! the current slot ids.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};

use crate::models::{MealItem, MealSlot, RecipeSet, Settings, validate_name, validate_time};

impl Settings {
    fn find_slot(&self, slot_id: &str) -> Result<&MealSlot> {
        self.slot(slot_id)
            .with_context(|| format!("Slot '{slot_id}' not found"))
    }

    fn find_set(&self, set_id: &str) -> Result<&RecipeSet> {
        self.recipe_set(set_id)
            .with_context(|| format!("Recipe set '{set_id}' not found"))
    }

    fn map_slot(&self, slot_id: &str, f: impl FnOnce(&mut MealSlot)) -> Result<Self> {
        self.find_slot(slot_id)?;
        let mut next = self.clone();
        if let Some(slot) = next.slots.iter_mut().find(|s| s.id == slot_id) {
            f(slot);
        }
        Ok(next)
    }

    fn map_set(&self, set_id: &str, f: impl FnOnce(&mut RecipeSet) -> Result<()>) -> Result<Self> {
        self.find_set(set_id)?;
        let mut next = self.clone();
        if let Some(set) = next.recipe_sets.iter_mut().find(|s| s.id == set_id) {
            f(set)?;
        }
        Ok(next)
    }

    fn map_items(
        &self,
        set_id: &str,
        slot_id: &str,
        f: impl FnOnce(&mut Vec<MealItem>) -> Result<()>,
    ) -> Result<Self> {
        self.find_slot(slot_id)?;
        self.map_set(set_id, |set| {
            f(set.items_by_slot.entry(slot_id.to_string()).or_default())
        })
    }

    /// Append a slot; every recipe set gets an empty item list for it.
    pub fn add_slot(&self, id: &str, name: &str, time: &str) -> Result<Self> {
        if self.slot(id).is_some() {
            bail!("Slot '{id}' already exists");
        }
        let slot = MealSlot {
            id: id.to_string(),
            name: validate_name("Slot", name)?,
            time: validate_time(time)?,
        };
        let mut next = self.clone();
        next.slots.push(slot);
        for set in &mut next.recipe_sets {
            set.items_by_slot.entry(id.to_string()).or_default();
        }
        Ok(next)
    }

    /// Remove a slot and its item list from every recipe set.
    pub fn remove_slot(&self, slot_id: &str) -> Result<Self> {
        self.find_slot(slot_id)?;
        let mut next = self.clone();
        next.slots.retain(|s| s.id != slot_id);
        for set in &mut next.recipe_sets {
            set.items_by_slot.remove(slot_id);
        }
        Ok(next)
    }

    /// Renaming never touches `items_by_slot`, which is keyed by id.
    pub fn rename_slot(&self, slot_id: &str, name: &str) -> Result<Self> {
        let name = validate_name("Slot", name)?;
        self.map_slot(slot_id, |slot| slot.name = name)
    }

    pub fn set_slot_time(&self, slot_id: &str, time: &str) -> Result<Self> {
        let time = validate_time(time)?;
        self.map_slot(slot_id, |slot| slot.time = time)
    }

    /// Add an empty recipe set. Becomes the default when none is set.
    pub fn add_recipe_set(&self, id: &str, name: &str) -> Result<Self> {
        if self.has_recipe_set(id) {
            bail!("Recipe set '{id}' already exists");
        }
        let items_by_slot: BTreeMap<String, Vec<MealItem>> = self
            .slots
            .iter()
            .map(|s| (s.id.clone(), Vec::new()))
            .collect();
        let mut next = self.clone();
        next.recipe_sets.push(RecipeSet {
            id: id.to_string(),
            name: validate_name("Recipe set", name)?,
            items_by_slot,
        });
        if next.default_set_id.is_none() {
            next.default_set_id = Some(id.to_string());
        }
        Ok(next)
    }

    /// Remove a recipe set. If it was the default, the first remaining set takes over.
    pub fn remove_recipe_set(&self, set_id: &str) -> Result<Self> {
        self.find_set(set_id)?;
        let mut next = self.clone();
        next.recipe_sets.retain(|s| s.id != set_id);
        if next.default_set_id.as_deref() == Some(set_id) {
            next.default_set_id = next.recipe_sets.first().map(|s| s.id.clone());
        }
        Ok(next)
    }

    pub fn rename_recipe_set(&self, set_id: &str, name: &str) -> Result<Self> {
        let name = validate_name("Recipe set", name)?;
        self.map_set(set_id, |set| {
            set.name = name;
            Ok(())
        })
    }

    pub fn set_default_set(&self, set_id: &str) -> Result<Self> {
        self.find_set(set_id)?;
        let mut next = self.clone();
        next.default_set_id = Some(set_id.to_string());
        Ok(next)
    }

    pub fn add_item(&self, set_id: &str, slot_id: &str, item: MealItem) -> Result<Self> {
        let item = MealItem {
            name: validate_name("Item", &item.name)?,
            ..item
        };
        self.map_items(set_id, slot_id, |items| {
            if items.iter().any(|i| i.id == item.id) {
                bail!("Item '{}' already exists in this slot", item.id);
            }
            items.push(item);
            Ok(())
        })
    }

    pub fn remove_item(&self, set_id: &str, slot_id: &str, item_id: &str) -> Result<Self> {
        self.map_items(set_id, slot_id, |items| {
            let before = items.len();
            items.retain(|i| i.id != item_id);
            if items.len() == before {
                bail!("Item '{item_id}' not found");
            }
            Ok(())
        })
    }

    /// Change an item's name and/or planned grams.
    pub fn update_item(
        &self,
        set_id: &str,
        slot_id: &str,
        item_id: &str,
        name: Option<&str>,
        grams: Option<u32>,
    ) -> Result<Self> {
        let name = name.map(|n| validate_name("Item", n)).transpose()?;
        self.map_items(set_id, slot_id, |items| {
            let item = items
                .iter_mut()
                .find(|i| i.id == item_id)
                .with_context(|| format!("Item '{item_id}' not found"))?;
            if let Some(name) = name {
                item.name = name;
            }
            if let Some(grams) = grams {
                item.grams = grams;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_settings;

    fn beans() -> MealItem {
        MealItem {
            id: "x9".to_string(),
            name: "豆浆".to_string(),
            grams: 250,
        }
    }

    #[test]
    fn test_add_slot_extends_every_set() {
        let settings = Settings::default()
            .add_recipe_set("B", "周末")
            .unwrap()
            .add_slot("late", "夜宵", "22:30")
            .unwrap();
        assert_eq!(settings.slots.last().unwrap().id, "late");
        for set in &settings.recipe_sets {
            assert!(set.items_by_slot["late"].is_empty());
            assert_eq!(set.items_by_slot.len(), settings.slots.len());
        }
    }

    #[test]
    fn test_add_slot_rejects_duplicates_and_bad_time() {
        let settings = Settings::default();
        assert!(settings.add_slot("lunch", "午餐", "12:00").is_err());
        assert!(settings.add_slot("late", "夜宵", "25:00").is_err());
        assert!(settings.add_slot("late", " ", "22:00").is_err());
    }

    #[test]
    fn test_remove_slot_cascades() {
        let settings = Settings::default().remove_slot("snack").unwrap();
        assert!(settings.slot("snack").is_none());
        for set in &settings.recipe_sets {
            assert!(!set.items_by_slot.contains_key("snack"));
        }
        assert!(settings.remove_slot("snack").is_err());
    }

    #[test]
    fn test_rename_slot_keeps_keys() {
        let settings = Settings::default().rename_slot("lunch", "工作餐").unwrap();
        assert_eq!(settings.slot("lunch").unwrap().name, "工作餐");
        assert_eq!(settings.recipe_sets[0].items_for("lunch").len(), 2);
    }

    #[test]
    fn test_set_slot_time_normalizes() {
        let settings = Settings::default().set_slot_time("breakfast", "7:30").unwrap();
        assert_eq!(settings.slot("breakfast").unwrap().time, "07:30");
        assert!(Settings::default().set_slot_time("nope", "07:30").is_err());
    }

    #[test]
    fn test_add_recipe_set_becomes_default_when_unset() {
        let mut settings = Settings::default();
        settings.recipe_sets.clear();
        settings.default_set_id = None;
        let settings = settings.add_recipe_set("A", "日常").unwrap();
        assert_eq!(settings.default_set_id.as_deref(), Some("A"));
        assert_eq!(settings.recipe_sets[0].items_by_slot.len(), 4);

        let settings = settings.add_recipe_set("B", "减脂").unwrap();
        assert_eq!(settings.default_set_id.as_deref(), Some("A"));
        assert!(settings.add_recipe_set("B", "again").is_err());
    }

    #[test]
    fn test_remove_default_recipe_set_reassigns() {
        let settings = Settings::default()
            .add_recipe_set("B", "减脂")
            .unwrap()
            .remove_recipe_set("default")
            .unwrap();
        assert_eq!(settings.default_set_id.as_deref(), Some("B"));
        let settings = settings.remove_recipe_set("B").unwrap();
        assert_eq!(settings.default_set_id, None);
        assert!(settings.recipe_sets.is_empty());
    }

    #[test]
    fn test_rename_and_set_default() {
        let settings = Settings::default()
            .add_recipe_set("B", "减脂")
            .unwrap()
            .rename_recipe_set("B", "增肌")
            .unwrap()
            .set_default_set("B")
            .unwrap();
        assert_eq!(settings.recipe_set("B").unwrap().name, "增肌");
        assert_eq!(settings.default_set_id.as_deref(), Some("B"));
        assert!(settings.set_default_set("Z").is_err());
    }

    #[test]
    fn test_item_edits() {
        let settings = Settings::default()
            .add_item("default", "breakfast", beans())
            .unwrap();
        assert_eq!(settings.recipe_sets[0].items_for("breakfast").len(), 2);
        assert!(settings.add_item("default", "breakfast", beans()).is_err());

        let settings = settings
            .update_item("default", "breakfast", "x9", None, Some(300))
            .unwrap();
        let item = &settings.recipe_sets[0].items_for("breakfast")[1];
        assert_eq!(item.grams, 300);
        assert_eq!(item.name, "豆浆");

        let settings = settings.remove_item("default", "breakfast", "x9").unwrap();
        assert_eq!(settings.recipe_sets[0].items_for("breakfast").len(), 1);
        assert!(settings.remove_item("default", "breakfast", "x9").is_err());
        assert!(settings.add_item("default", "brunch", beans()).is_err());
        assert!(settings.add_item("nope", "breakfast", beans()).is_err());
    }

    #[test]
    fn test_edits_survive_normalization_unchanged() {
        let settings = Settings::default()
            .add_slot("late", "夜宵", "22:00")
            .unwrap()
            .add_recipe_set("B", "减脂")
            .unwrap()
            .add_item("B", "late", beans())
            .unwrap()
            .remove_slot("snack")
            .unwrap();
        let reloaded = normalize_settings(&serde_json::to_value(&settings).unwrap());
        assert_eq!(reloaded, settings);
    }
}
