//! Command-line interface for mentorlink.

mod commands;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, StatusCommand};

use crate::config::Config;
use crate::logging::Verbosity;

/// mentorlink - Mentor and student records
///
/// Students submit their details and marks, mentors review them and leave
/// feedback. Everything is kept in append-only tables on local disk.
#[derive(Debug, Parser)]
#[command(name = "mentorlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive session
    Session,

    /// Show storage backend, location and record counts
    Status(StatusCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// The configuration file in effect: `--config` when given, otherwise
    /// the default location.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(Config::default_config_path)
    }

    /// The file `config validate` checks: its own `--file`, falling back to
    /// [`Cli::config_file`].
    #[must_use]
    pub fn validate_target(&self, file: Option<&Path>) -> PathBuf {
        file.map_or_else(|| self.config_file(), Path::to_path_buf)
    }

    /// Logging verbosity from `-q` and `-v`.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
