mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    ExportFormat, cmd_add, cmd_backup_export, cmd_backup_import, cmd_check, cmd_done, cmd_export,
    cmd_grams, cmd_history, cmd_item_add, cmd_item_remove, cmd_item_update, cmd_remind,
    cmd_remove, cmd_save, cmd_set_add, cmd_set_default, cmd_set_list, cmd_set_remove,
    cmd_set_rename, cmd_set_show, cmd_slot_add, cmd_slot_list, cmd_slot_remove, cmd_slot_rename,
    cmd_slot_time, cmd_switch, cmd_today,
};
use crate::config::Config;
use mealplan_core::service::MealPlanService;

#[derive(Parser)]
#[command(
    name = "mealplan",
    version,
    about = "Plan your meals, then tick them off",
    long_about = "Plan your meals, then tick them off.\n\n\
        Slots are the meals of your day (breakfast at 10:00, lunch at 13:00, ...).\n\
        Recipe sets are alternative menus that fill those slots with foods and grams.\n\
        Each day you check off what you ate and record how much."
)]
struct Cli {
    /// Path to the database file
    #[arg(long, global = true, env = "MEALPLAN_DB", value_name = "PATH")]
    db: Option<PathBuf>,
    /// Show diagnostic logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the plan for a day (defaults to today)
    Today {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check or uncheck an entry
    Check {
        /// Slot id or name
        slot: String,
        /// Item id, log id, or food name
        entry: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record how many grams you actually ate
    Grams {
        /// Slot id or name
        slot: String,
        /// Item id, log id, or food name
        entry: String,
        /// Amount (e.g. "80" or "80g")
        grams: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a food that is not on the menu
    Add {
        /// Slot id or name
        slot: String,
        /// Food name
        name: String,
        /// Amount (e.g. "120" or "120g", default: 0)
        grams: Option<String>,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a custom entry by its log id
    Remove {
        /// Slot id or name
        slot: String,
        /// Log id of the custom entry
        log_id: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check every entry of a slot (or uncheck all if already complete)
    Done {
        /// Slot id or name
        slot: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Use another recipe set for one slot on one day. With no set, go back to the default
    Switch {
        /// Slot id or name
        slot: String,
        /// Recipe set id or name
        set: Option<String>,
        /// Switch to the next recipe set
        #[arg(long, conflicts_with_all = ["set", "prev"])]
        next: bool,
        /// Switch to the previous recipe set
        #[arg(long, conflicts_with = "set")]
        prev: bool,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a meal as saved
    Save {
        /// Slot id or name
        slot: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage meal slots
    Slot {
        #[command(subcommand)]
        command: SlotCommands,
    },
    /// Manage recipe sets and their items
    Set {
        #[command(subcommand)]
        command: SetCommands,
    },
    /// Show logged meals, newest day first
    History {
        /// Number of most recent logged days to show (default: all)
        #[arg(short, long)]
        days: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the meal log
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Write or restore a full backup
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Show meal reminders
    Remind {
        /// Only reminders due right now (for running from cron every minute)
        #[arg(long)]
        due: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SlotCommands {
    /// List slots
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a slot (every recipe set gets an empty list for it)
    Add {
        /// Slot name (e.g. 早餐, 午餐, 晚餐, 下午加餐, 夜宵)
        name: String,
        /// Time of day, HH:MM
        time: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a slot and its items from every recipe set
    Remove {
        /// Slot id or name
        slot: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a slot
    Rename {
        /// Slot id or name
        slot: String,
        /// New name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a slot's time
    Time {
        /// Slot id or name
        slot: String,
        /// Time of day, HH:MM
        time: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SetCommands {
    /// List recipe sets (* marks the default)
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the items of a recipe set per slot
    Show {
        /// Recipe set id or name
        set: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an empty recipe set
    Add {
        /// Recipe set name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe set
    Remove {
        /// Recipe set id or name
        set: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a recipe set
    Rename {
        /// Recipe set id or name
        set: String,
        /// New name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Make a recipe set the default for days without an override
    Default {
        /// Recipe set id or name
        set: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the items of a recipe set
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Add a planned food to a slot of a recipe set
    Add {
        /// Recipe set id or name
        set: String,
        /// Slot id or name
        slot: String,
        /// Food name
        name: String,
        /// Planned amount (e.g. "50" or "50g")
        grams: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a planned food
    Remove {
        /// Recipe set id or name
        set: String,
        /// Slot id or name
        slot: String,
        /// Item id or food name
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a planned food's grams or name
    Update {
        /// Recipe set id or name
        set: String,
        /// Slot id or name
        slot: String,
        /// Item id or food name
        item: String,
        /// New planned amount
        #[arg(short, long)]
        grams: Option<String>,
        /// New food name
        #[arg(short, long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Write everything to a JSON file
    Export {
        /// Destination file
        path: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace everything with the contents of a backup file
    Import {
        /// Backup file
        path: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db)?;
    log::debug!("Using database {}", config.db_path.display());
    let svc = MealPlanService::new(&config.db_path)?;

    match cli.command {
        Commands::Today { date, json } => cmd_today(&svc, date, json),
        Commands::Check {
            slot,
            entry,
            date,
            json,
        } => cmd_check(&svc, &slot, &entry, date, json),
        Commands::Grams {
            slot,
            entry,
            grams,
            date,
            json,
        } => cmd_grams(&svc, &slot, &entry, &grams, date, json),
        Commands::Add {
            slot,
            name,
            grams,
            date,
            json,
        } => cmd_add(&svc, &slot, &name, grams.as_deref(), date, json),
        Commands::Remove {
            slot,
            log_id,
            date,
            json,
        } => cmd_remove(&svc, &slot, &log_id, date, json),
        Commands::Done { slot, date, json } => cmd_done(&svc, &slot, date, json),
        Commands::Switch {
            slot,
            set,
            next,
            prev,
            date,
            json,
        } => cmd_switch(&svc, &slot, set.as_deref(), next, prev, date, json),
        Commands::Save { slot, date, json } => cmd_save(&svc, &slot, date, json),
        Commands::Slot { command } => match command {
            SlotCommands::List { json } => cmd_slot_list(&svc, json),
            SlotCommands::Add { name, time, json } => cmd_slot_add(&svc, &name, &time, json),
            SlotCommands::Remove { slot, json } => cmd_slot_remove(&svc, &slot, json),
            SlotCommands::Rename { slot, name, json } => cmd_slot_rename(&svc, &slot, &name, json),
            SlotCommands::Time { slot, time, json } => cmd_slot_time(&svc, &slot, &time, json),
        },
        Commands::Set { command } => match command {
            SetCommands::List { json } => cmd_set_list(&svc, json),
            SetCommands::Show { set, json } => cmd_set_show(&svc, &set, json),
            SetCommands::Add { name, json } => cmd_set_add(&svc, &name, json),
            SetCommands::Remove { set, json } => cmd_set_remove(&svc, &set, json),
            SetCommands::Rename { set, name, json } => cmd_set_rename(&svc, &set, &name, json),
            SetCommands::Default { set, json } => cmd_set_default(&svc, &set, json),
            SetCommands::Item { command } => match command {
                ItemCommands::Add {
                    set,
                    slot,
                    name,
                    grams,
                    json,
                } => cmd_item_add(&svc, &set, &slot, &name, &grams, json),
                ItemCommands::Remove {
                    set,
                    slot,
                    item,
                    json,
                } => cmd_item_remove(&svc, &set, &slot, &item, json),
                ItemCommands::Update {
                    set,
                    slot,
                    item,
                    grams,
                    name,
                    json,
                } => cmd_item_update(
                    &svc,
                    &set,
                    &slot,
                    &item,
                    grams.as_deref(),
                    name.as_deref(),
                    json,
                ),
            },
        },
        Commands::History { days, json } => cmd_history(&svc, days, json),
        Commands::Export { format, output } => cmd_export(&svc, format, output.as_deref()),
        Commands::Backup { command } => match command {
            BackupCommands::Export { path, json } => cmd_backup_export(&svc, &path, json),
            BackupCommands::Import { path, json } => cmd_backup_import(&svc, &path, json),
        },
        Commands::Remind { due, json } => cmd_remind(&svc, due, json),
    }
}
