//! API Module
//!
//! - commands.rs: one handler per CLI subcommand

pub mod commands;
