//! Command-line interface
//!
//! Compiles a directive file and answers limit decisions from the shell,
//! writing JSON to stdout.

pub mod args;
pub mod commands;
pub mod errors;

pub use args::{Cli, Command};
pub use commands::{run, run_command, CheckInput, EXIT_OK, EXIT_REJECTED};
pub use errors::{CliError, CliResult};
