//! Terminal front end for usagebar: a status strip, usage panel and settings
//! form driven by `usagebar-core`, plus one-shot CLI commands.

pub mod commands;
pub mod config;
pub mod state;
pub mod ui;
