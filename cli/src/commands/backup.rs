use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::info;

use mealplan_core::export::{BackupData, CSV_BOM};
use mealplan_core::service::MealPlanService;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ExportFormat {
    Csv,
    Json,
}

pub(crate) fn cmd_export(
    svc: &MealPlanService,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let body = match format {
        ExportFormat::Csv => svc.export_csv()?,
        ExportFormat::Json => svc.export_json()?,
    };

    match output {
        None => println!("{body}"),
        Some(path) => {
            let contents = match format {
                ExportFormat::Csv => format!("{CSV_BOM}{body}"),
                ExportFormat::Json => body,
            };
            std::fs::write(path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {format:?} export to {}", path.display());
            eprintln!("Exported meal log to {}", path.display());
        }
    }
    Ok(())
}

pub(crate) fn cmd_backup_export(svc: &MealPlanService, path: &Path, json: bool) -> Result<()> {
    let backup = svc.export_backup()?;
    let body = serde_json::to_string_pretty(&backup)?;
    std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string(),
                "logs": backup.logs.len(),
                "exportedAt": backup.exported_at,
            })
        );
    } else {
        println!("Backup written to {}", path.display());
        println!("  Log entries: {}", backup.logs.len());
    }
    Ok(())
}

pub(crate) fn cmd_backup_import(svc: &MealPlanService, path: &Path, json: bool) -> Result<()> {
    let file = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let backup: BackupData = serde_json::from_str(&file)
        .with_context(|| format!("{} is not a mealplan backup", path.display()))?;

    let summary = svc.import_backup(&backup)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Import complete.\n");
        println!("  Slots:          {}", summary.slots);
        println!("  Recipe sets:    {}", summary.recipe_sets);
        println!("  Log entries:    {}", summary.logs);
        println!("  Set overrides:  {} days", summary.selection_days);
        println!("  Saved meals:    {} days", summary.saved_meal_days);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_file_gets_bom() {
        let svc = MealPlanService::new_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        cmd_export(&svc, ExportFormat::Csv, Some(&path)).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(CSV_BOM));
        assert!(written.contains("日期"));
    }

    #[test]
    fn test_backup_file_round_trip() {
        let svc = MealPlanService::new_in_memory().unwrap();
        svc.add_slot("夜宵", "22:00").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        cmd_backup_export(&svc, &path, true).unwrap();

        let other = MealPlanService::new_in_memory().unwrap();
        cmd_backup_import(&other, &path, true).unwrap();
        assert_eq!(other.settings().unwrap(), svc.settings().unwrap());
    }

    #[test]
    fn test_import_rejects_garbage() {
        let svc = MealPlanService::new_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(cmd_backup_import(&svc, &path, false).is_err());
    }
}
