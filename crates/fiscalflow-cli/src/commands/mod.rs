//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod diagnose;
pub mod process;

mod input;
mod report;
