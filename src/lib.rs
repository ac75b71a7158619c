pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod i18n;
pub mod models;
pub mod orchestrator;
pub mod session;
pub mod settings;
pub mod ui;
