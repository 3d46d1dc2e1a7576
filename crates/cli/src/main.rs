//! mooerctl - Mooer GE150 file tooling
//!
//! Inspect and edit `.mo` presets, split and build `.mbf` backups, inspect
//! `.gnr` IR files and encode/decode raw HID reports.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod completion;
mod error;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{BackupCommands, FrameCommands, IrCommands, PresetCommands};

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "MOOERCTL_LOG";

#[derive(Parser)]
#[command(name = "mooerctl")]
#[command(about = "Mooer GE150 tools - presets, backups, IR files and HID reports")]
#[command(version)]
#[command(long_about = "
mooerctl works on the files the Mooer GE150 editor reads and writes:
single presets (.mo), full backups (.mbf) and impulse responses (.gnr).
It can also encode and decode the 64-byte HID reports the pedal speaks,
which helps when reading USB captures.

Use --json for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preset file (.mo) commands
    #[command(subcommand)]
    Preset(PresetCommands),

    /// Backup file (.mbf) commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Impulse response file commands
    #[command(subcommand)]
    Ir(IrCommands),

    /// HID report encode/decode
    #[command(subcommand)]
    Frame(FrameCommands),

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_unset| {
            EnvFilter::new(format!("mooerctl={level},mooer_hid_protocol={level}"))
        }))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = error::exit_code(&e);
            if cli.json {
                output::print_error_json(&e, code);
            } else {
                output::print_error_human(&e);
            }
            ExitCode::from(code)
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Preset(cmd) => commands::preset::execute(cmd, cli.json),
        Commands::Backup(cmd) => commands::backup::execute(cmd, cli.json),
        Commands::Ir(cmd) => commands::ir::execute(cmd, cli.json),
        Commands::Frame(cmd) => commands::frame::execute(cmd, cli.json),
        Commands::Completion { shell } => {
            completion::generate_completion(*shell);
            Ok(())
        }
    }
}
