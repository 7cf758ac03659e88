//! attend: keeps an unattended machine joined to its meeting.
//!
//! ## Subcommands
//!
//! - `check`: Ensure the meeting is active, rejoining if needed (exit 0 when active)
//! - `join`: Run the join workflow
//! - `leave`: Leave the meeting and, unless `--keep`, close the client
//! - `status`: Print what the detector sees, without touching anything

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "attend")]
#[command(about = "Keeps an unattended machine joined to its meeting")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ~/.attend/config.toml, or $ATTEND_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Make sure the meeting is active; rejoin when it is not
    Check {
        /// Only report through the exit code
        #[arg(short, long)]
        quiet: bool,
    },

    /// Join the configured meeting
    Join {
        /// Don't print the configuration summary or step report
        #[arg(short, long)]
        quiet: bool,
    },

    /// Leave the meeting
    Leave {
        /// Don't print the step report
        #[arg(short, long)]
        quiet: bool,

        /// Keep the client running after leaving
        #[arg(short = 'k', long)]
        keep: bool,
    },

    /// Show the detected session state
    Status,
}

impl Commands {
    fn quiet(&self) -> bool {
        match self {
            Commands::Check { quiet } | Commands::Join { quiet } | Commands::Leave { quiet, .. } => {
                *quiet
            }
            Commands::Status => false,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _logging_guard = logging::init(cli.verbose, cli.command.quiet());

    let result = commands::Context::load(cli.config).and_then(|context| match cli.command {
        Commands::Check { quiet } => commands::check(&context, quiet),
        Commands::Join { quiet } => commands::join(&context, quiet),
        Commands::Leave { quiet, keep } => commands::leave(&context, quiet, keep),
        Commands::Status => commands::status(&context),
    });

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "attend failed");
            ExitCode::FAILURE
        }
    }
}
