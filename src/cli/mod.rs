//! CLI module
//!
//! - check: lint and compile entity definitions
//! - explain: show the predicate statement for a field set

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, LogLevel};
pub use commands::{check, explain, init_logging, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_logging(cli.log_level);
    run_command(cli.command)
}
