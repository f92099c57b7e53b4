//! cadstream CLI
//!
//! Streams a sectored model from a directory or URL while a camera orbits it,
//! generates synthetic models, and manages `~/.cadstream/config.ini`.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::generate::GenerateArgs;
use commands::stream::StreamArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "cadstream", version, about = "Camera-driven level-of-detail streaming for sectored CAD models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Stream a model while a camera orbits it
    Stream {
        /// Model directory or http(s) URL containing scene.json
        #[arg(long)]
        source: String,

        /// Maximum number of sectors loaded in detail
        #[arg(long)]
        budget: Option<usize>,

        /// Decode worker threads (0 = one per core)
        #[arg(long)]
        workers: Option<usize>,

        /// Stop after this many camera frames instead of waiting for Ctrl+C
        #[arg(long)]
        frames: Option<u64>,
    },

    /// Write a synthetic model to a directory
    Generate {
        /// Output directory
        #[arg(long)]
        output: PathBuf,

        /// Levels below the root sector
        #[arg(long, default_value_t = 3)]
        depth: u32,

        /// Children per sector
        #[arg(long, default_value_t = 4)]
        fanout: u32,

        /// Shared geometry files
        #[arg(long, default_value_t = 8)]
        geometry_files: u64,
    },

    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Stream {
            source,
            budget,
            workers,
            frames,
        } => commands::stream::run(StreamArgs {
            source,
            budget,
            workers,
            frames,
        }),
        Commands::Generate {
            output,
            depth,
            fanout,
            geometry_files,
        } => commands::generate::run(GenerateArgs {
            output,
            depth,
            fanout,
            geometry_files,
        }),
        Commands::Config { command } => commands::config::run(command),
    }
}
