//! CLI command handlers

pub mod config;
pub mod create;
pub mod list;
pub mod run;
pub mod show;
pub mod status;
