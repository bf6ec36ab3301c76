use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use log::{info, warn};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::export::BackupData;
use crate::models::{LogEntry, SavedMeals, Selection, Settings};
use crate::normalize::normalize_settings;

const SETTINGS_ROW_ID: &str = "main";
const META_DAILY_SET: &str = "dailySetSelection";
const META_SAVED_MEALS: &str = "savedMeals";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub slots: usize,
    pub recipe_sets: usize,
    pub logs: usize,
    pub selection_days: usize,
    pub saved_meal_days: usize,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            info!("Creating meal plan schema (user_version 1)");
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS settings (
                    id TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS log_entries (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    date TEXT NOT NULL,
                    slot_id TEXT NOT NULL,
                    item_id TEXT NOT NULL,
                    item_name TEXT NOT NULL,
                    planned_grams INTEGER NOT NULL DEFAULT 0,
                    actual_grams INTEGER,
                    checked INTEGER NOT NULL DEFAULT 0,
                    is_custom INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX IF NOT EXISTS idx_log_entries_date ON log_entries(date);
                CREATE INDEX IF NOT EXISTS idx_log_entries_date_slot ON log_entries(date, slot_id);

                CREATE TABLE IF NOT EXISTS meta (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn log_from_row(row: &rusqlite::Row) -> rusqlite::Result<LogEntry> {
        Ok(LogEntry {
            id: row.get(0)?,
            date: row.get(1)?,
            slot_id: row.get(2)?,
            item_id: row.get(3)?,
            item_name: row.get(4)?,
            planned_grams: row.get(5)?,
            actual_grams: row.get(6)?,
            checked: row.get(7)?,
            is_custom: row.get(8)?,
        })
    }

    fn query_logs(&self, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<LogEntry>> {
        let sql = format!(
            "SELECT id, date, slot_id, item_id, item_name, planned_grams, actual_grams, checked, is_custom
             FROM log_entries {filter}
             ORDER BY seq"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(args, Self::log_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    // --- Settings ---

    /// The stored settings payload as-is, before normalization.
    pub fn load_raw_settings(&self) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE id = ?1",
                params![SETTINGS_ROW_ID],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            None => Ok(None),
            Some(s) => match serde_json::from_str(&s) {
                Ok(v) => Ok(Some(v)),
                Err(e) => {
                    warn!("Stored settings are not valid JSON, ignoring them: {e}");
                    Ok(None)
                }
            },
        }
    }

    pub fn load_settings(&self) -> Result<Settings> {
        let raw = self.load_raw_settings()?.unwrap_or(Value::Null);
        Ok(normalize_settings(&raw))
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let value = serde_json::to_string(settings)?;
        self.save_raw_settings(&value)
    }

    /// Store a settings payload verbatim. Used for imports of older shapes.
    pub fn save_raw_settings(&self, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO settings (id, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![SETTINGS_ROW_ID, value, now],
        )?;
        Ok(())
    }

    // --- Log entries ---

    pub fn load_logs(&self) -> Result<Vec<LogEntry>> {
        self.query_logs("", &[])
    }

    pub fn logs_for_date(&self, date: &str) -> Result<Vec<LogEntry>> {
        self.query_logs("WHERE date = ?1", &[&date])
    }

    pub fn logs_for_date_and_slot(&self, date: &str, slot_id: &str) -> Result<Vec<LogEntry>> {
        self.query_logs("WHERE date = ?1 AND slot_id = ?2", &[&date, &slot_id])
    }

    /// Replace the whole log collection, preserving its order.
    pub fn replace_logs(&self, logs: &[LogEntry]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.write_logs(logs)?;
        tx.commit()?;
        Ok(())
    }

    // Caller owns the transaction.
    fn write_logs(&self, logs: &[LogEntry]) -> Result<()> {
        self.conn.execute("DELETE FROM log_entries", [])?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO log_entries
                (id, date, slot_id, item_id, item_name, planned_grams, actual_grams, checked, is_custom)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for log in logs {
            stmt.execute(params![
                log.id,
                log.date,
                log.slot_id,
                log.item_id,
                log.item_name,
                log.planned_grams,
                log.actual_grams,
                log.checked,
                log.is_custom,
            ])
            .with_context(|| format!("Failed to store log entry {}", log.id))?;
        }
        Ok(())
    }

    // --- Meta documents ---

    fn get_meta<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        let Some(raw) = raw else {
            return Ok(T::default());
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!("Stored '{key}' is malformed, starting empty: {e}");
                Ok(T::default())
            }
        }
    }

    fn set_meta<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let value = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO meta (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn load_selection(&self) -> Result<Selection> {
        self.get_meta(META_DAILY_SET)
    }

    pub fn save_selection(&self, selection: &Selection) -> Result<()> {
        self.set_meta(META_DAILY_SET, selection)
    }

    pub fn load_saved_meals(&self) -> Result<SavedMeals> {
        self.get_meta(META_SAVED_MEALS)
    }

    pub fn save_saved_meals(&self, saved: &SavedMeals) -> Result<()> {
        self.set_meta(META_SAVED_MEALS, saved)
    }

    // --- Backup ---

    pub fn export_all(&self) -> Result<BackupData> {
        BackupData::new(
            &self.load_settings()?,
            self.load_logs()?,
            self.load_selection()?,
            self.load_saved_meals()?,
        )
    }

    /// Replace everything with the backup's contents. Settings are normalized first.
    pub fn import_all(&self, data: &BackupData) -> Result<ImportSummary> {
        let settings = data.settings();
        let tx = self.conn.unchecked_transaction()?;
        self.save_settings(&settings)?;
        self.write_logs(&data.logs)?;
        self.save_selection(&data.daily_set_selection)?;
        self.save_saved_meals(&data.saved_meals)?;
        tx.commit()?;

        info!(
            "Imported backup: {} slots, {} recipe sets, {} log entries",
            settings.slots.len(),
            settings.recipe_sets.len(),
            data.logs.len()
        );
        Ok(ImportSummary {
            slots: settings.slots.len(),
            recipe_sets: settings.recipe_sets.len(),
            logs: data.logs.len(),
            selection_days: data.daily_set_selection.len(),
            saved_meal_days: data.saved_meals.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DEFAULT_SET_ID, RecipeSet};
    use crate::selection::select_set;

    fn sample_log(id: &str, date: &str, slot: &str) -> LogEntry {
        LogEntry {
            id: id.to_string(),
            date: date.to_string(),
            slot_id: slot.to_string(),
            item_id: format!("item-{id}"),
            item_name: "牛肉".to_string(),
            planned_grams: 50,
            actual_grams: Some(40),
            checked: true,
            is_custom: false,
        }
    }

    #[test]
    fn test_fresh_database_has_default_settings() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_raw_settings().unwrap().is_none());
        assert_eq!(db.load_settings().unwrap(), Settings::default());
        assert!(db.load_logs().unwrap().is_empty());
        assert!(db.load_selection().unwrap().is_empty());
        assert!(db.load_saved_meals().unwrap().is_empty());
    }

    #[test]
    fn test_settings_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings::default().add_recipe_set("B", "减脂").unwrap();
        db.save_settings(&settings).unwrap();
        assert_eq!(db.load_settings().unwrap(), settings);

        // Saving again overwrites the single row.
        let settings = settings.set_default_set("B").unwrap();
        db.save_settings(&settings).unwrap();
        assert_eq!(
            db.load_settings().unwrap().default_set_id.as_deref(),
            Some("B")
        );
    }

    #[test]
    fn test_legacy_settings_are_normalized_on_load() {
        let db = Database::open_in_memory().unwrap();
        db.save_raw_settings(
            r#"{"slots":[{"id":"lunch","name":"午餐","time":"13:00"}],"itemsBySlot":{"lunch":[]}}"#,
        )
        .unwrap();
        let settings = db.load_settings().unwrap();
        assert_eq!(settings.recipe_sets.len(), 1);
        assert_eq!(settings.recipe_sets[0].id, DEFAULT_SET_ID);
        // Raw payload is untouched until the next save.
        assert!(db.load_raw_settings().unwrap().unwrap().get("recipeSets").is_none());
    }

    #[test]
    fn test_corrupt_settings_fall_back_to_defaults() {
        let db = Database::open_in_memory().unwrap();
        db.save_raw_settings("{not json").unwrap();
        assert_eq!(db.load_settings().unwrap(), Settings::default());
    }

    #[test]
    fn test_replace_logs_preserves_order() {
        let db = Database::open_in_memory().unwrap();
        let logs = vec![
            sample_log("b", "2024-01-01", "lunch"),
            sample_log("a", "2024-01-01", "lunch"),
            sample_log("c", "2024-01-02", "dinner"),
        ];
        db.replace_logs(&logs).unwrap();
        assert_eq!(db.load_logs().unwrap(), logs);

        let replaced = vec![logs[2].clone(), logs[0].clone()];
        db.replace_logs(&replaced).unwrap();
        assert_eq!(db.load_logs().unwrap(), replaced);
    }

    #[test]
    fn test_log_null_actual_grams() {
        let db = Database::open_in_memory().unwrap();
        let mut log = sample_log("a", "2024-01-01", "lunch");
        log.actual_grams = None;
        log.is_custom = true;
        db.replace_logs(std::slice::from_ref(&log)).unwrap();
        assert_eq!(db.load_logs().unwrap(), vec![log]);
    }

    #[test]
    fn test_logs_for_date_and_slot() {
        let db = Database::open_in_memory().unwrap();
        db.replace_logs(&[
            sample_log("a", "2024-01-01", "lunch"),
            sample_log("b", "2024-01-01", "dinner"),
            sample_log("c", "2024-01-02", "lunch"),
        ])
        .unwrap();
        assert_eq!(db.logs_for_date("2024-01-01").unwrap().len(), 2);
        let lunch = db.logs_for_date_and_slot("2024-01-01", "lunch").unwrap();
        assert_eq!(lunch.len(), 1);
        assert_eq!(lunch[0].id, "a");
        assert!(db.logs_for_date("2023-12-31").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_log_ids_roll_back() {
        let db = Database::open_in_memory().unwrap();
        db.replace_logs(&[sample_log("a", "2024-01-01", "lunch")])
            .unwrap();
        let result = db.replace_logs(&[
            sample_log("x", "2024-01-01", "lunch"),
            sample_log("x", "2024-01-01", "dinner"),
        ]);
        assert!(result.is_err());
        let logs = db.load_logs().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, "a");
    }

    #[test]
    fn test_selection_and_saved_meals_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let selection = select_set(&Selection::new(), "2024-01-01", "lunch", "B");
        db.save_selection(&selection).unwrap();
        assert_eq!(db.load_selection().unwrap(), selection);

        let saved = SavedMeals::from([("2024-01-01".to_string(), vec!["lunch".to_string()])]);
        db.save_saved_meals(&saved).unwrap();
        assert_eq!(db.load_saved_meals().unwrap(), saved);
    }

    #[test]
    fn test_export_import_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings {
            recipe_sets: vec![RecipeSet {
                id: "A".to_string(),
                name: "A".to_string(),
                items_by_slot: Default::default(),
            }],
            default_set_id: Some("A".to_string()),
            ..Settings::default()
        };
        db.save_settings(&settings).unwrap();
        db.replace_logs(&[sample_log("a", "2024-01-01", "lunch")])
            .unwrap();
        db.save_selection(&select_set(&Selection::new(), "2024-01-01", "lunch", "A"))
            .unwrap();
        let backup = db.export_all().unwrap();

        let other = Database::open_in_memory().unwrap();
        let summary = other.import_all(&backup).unwrap();
        assert_eq!(summary.slots, 4);
        assert_eq!(summary.recipe_sets, 1);
        assert_eq!(summary.logs, 1);
        assert_eq!(summary.selection_days, 1);
        assert_eq!(summary.saved_meal_days, 0);

        // Normalization filled one key per slot.
        let imported = other.load_settings().unwrap();
        assert_eq!(imported.recipe_sets[0].items_by_slot.len(), 4);
        assert_eq!(other.load_logs().unwrap(), db.load_logs().unwrap());
        assert_eq!(other.load_selection().unwrap(), db.load_selection().unwrap());
    }

    #[test]
    fn test_file_backed_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mealplan.db");
        {
            let db = Database::open(&path).unwrap();
            db.replace_logs(&[sample_log("a", "2024-01-01", "lunch")])
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.load_logs().unwrap().len(), 1);
    }
}
