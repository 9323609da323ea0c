//! CLI argument definitions using clap
//!
//! Commands:
//! - columndao check --definition <path> [--config <path>]
//! - columndao explain --definition <path> --fields a,b [--config <path>]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::observability::Severity;

/// columndao - lint and compile entity definitions for the column-store DAO
#[derive(Parser, Debug)]
#[command(name = "columndao")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Minimum severity of log lines written while the command runs
    #[arg(long, value_enum, global = true, default_value = "warn")]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load, lint and compile every statement of one or more definitions
    Check {
        /// Definition file, or a directory of *.json definitions
        #[arg(long)]
        definition: PathBuf,

        /// DAO configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the predicate statement a field set resolves to
    Explain {
        /// Definition file
        #[arg(long)]
        definition: PathBuf,

        /// Predicate fields, comma separated; empty for a full scan
        #[arg(long, value_delimiter = ',', default_value = "")]
        fields: Vec<String>,

        /// DAO configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Severity {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Severity::Trace,
            LogLevel::Info => Severity::Info,
            LogLevel::Warn => Severity::Warn,
            LogLevel::Error => Severity::Error,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
