mod backup;
mod helpers;
mod log;
mod recipe;
mod remind;
mod slot;
mod summary;

pub(crate) use backup::{ExportFormat, cmd_backup_export, cmd_backup_import, cmd_export};
pub(crate) use log::{cmd_add, cmd_check, cmd_done, cmd_grams, cmd_remove, cmd_save};
pub(crate) use recipe::{
    cmd_item_add, cmd_item_remove, cmd_item_update, cmd_set_add, cmd_set_default, cmd_set_list,
    cmd_set_remove, cmd_set_rename, cmd_set_show, cmd_switch,
};
pub(crate) use remind::cmd_remind;
pub(crate) use slot::{
    cmd_slot_add, cmd_slot_list, cmd_slot_remove, cmd_slot_rename, cmd_slot_time,
};
pub(crate) use summary::{cmd_history, cmd_today};
