use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{LogEntry, SavedMeals, Selection, Settings};
use crate::normalize::normalize_settings;

/// Prepended to CSV files so spreadsheet apps detect UTF-8.
pub const CSV_BOM: &str = "\u{FEFF}";
pub const CSV_HEADER: [&str; 7] = [
    "日期",
    "餐次",
    "食物名称",
    "计划克数",
    "实际克数",
    "已完成",
    "自定义项",
];
pub const BACKUP_VERSION: i64 = 1;

fn yes_no(flag: bool) -> &'static str {
    if flag { "是" } else { "否" }
}

/// Render logs as CSV. Every field is quoted and rows are separated by CRLF, with no line break
/// after the last row. Slot ids are shown by name when the slot still exists; unset actual
/// grams are left empty.
pub fn logs_to_csv(logs: &[LogEntry], settings: &Settings) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    wtr.write_record(CSV_HEADER)?;
    for log in logs {
        let planned = log.planned_grams.to_string();
        let actual = log.actual_grams.map(|g| g.to_string()).unwrap_or_default();
        wtr.write_record([
            log.date.as_str(),
            settings.slot_name(&log.slot_id),
            log.item_name.as_str(),
            planned.as_str(),
            actual.as_str(),
            yes_no(log.checked),
            yes_no(log.is_custom),
        ])?;
    }

    let bytes = wtr.into_inner().context("Failed to flush CSV output")?;
    let mut out = String::from_utf8(bytes).context("CSV output is not valid UTF-8")?;
    out.truncate(out.trim_end_matches("\r\n").len());
    Ok(out)
}

pub fn logs_to_json(logs: &[LogEntry]) -> Result<String> {
    serde_json::to_string_pretty(logs).context("Failed to serialize logs")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayLogs {
    pub date: String,
    pub entries: Vec<LogEntry>,
}

/// Logs grouped per date, newest date first. Entries keep collection order.
#[must_use]
pub fn group_by_date(logs: &[LogEntry]) -> Vec<DayLogs> {
    let mut by_date: BTreeMap<&str, Vec<LogEntry>> = BTreeMap::new();
    for log in logs {
        by_date.entry(&log.date).or_default().push(log.clone());
    }
    by_date
        .into_iter()
        .rev()
        .map(|(date, entries)| DayLogs {
            date: date.to_string(),
            entries,
        })
        .collect()
}

/// Full JSON backup of everything the store holds.
///
/// `settings` stays raw so that older backups go through normalization on import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    #[serde(default = "backup_version")]
    pub version: i64,
    #[serde(default)]
    pub exported_at: String,
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub daily_set_selection: Selection,
    #[serde(default)]
    pub saved_meals: SavedMeals,
}

fn backup_version() -> i64 {
    BACKUP_VERSION
}

impl BackupData {
    pub fn new(
        settings: &Settings,
        logs: Vec<LogEntry>,
        daily_set_selection: Selection,
        saved_meals: SavedMeals,
    ) -> Result<Self> {
        Ok(Self {
            version: BACKUP_VERSION,
            exported_at: Local::now().to_rfc3339(),
            settings: serde_json::to_value(settings)?,
            logs,
            daily_set_selection,
            saved_meals,
        })
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        normalize_settings(&self.settings)
    }
}
