//! CLI subcommands.

pub mod config;
pub mod generate;
pub mod stream;
