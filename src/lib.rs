pub mod app;
pub mod cli;
pub mod config;
pub mod editor;
pub mod highlight;
pub mod notes;
pub mod richtext;
pub mod search;
pub mod store;
pub mod toast;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
