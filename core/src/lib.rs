pub mod db;
pub mod export;
pub mod logbook;
pub mod models;
pub mod normalize;
pub mod plan;
pub mod reminders;
pub mod selection;
pub mod service;
pub mod settings;
