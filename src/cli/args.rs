//! CLI argument definitions using clap
//!
//! Commands:
//! - dirlimits rules [--config <path>] --policy <path>
//! - dirlimits check [--config <path>] --policy <path> [--dn <dn>] [--time <s>] [--size <n>] [--paged]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dirlimits - per-identity search limits for directory servers
#[derive(Parser, Debug)]
#[command(name = "dirlimits")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Compile a policy and print the resulting rule table as JSON
    Rules {
        /// Path to engine configuration file; built-in defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Path to limits directive file
        #[arg(long)]
        policy: PathBuf,
    },

    /// Decide the limits for one search request
    ///
    /// Prints the decision as JSON. Exits 2 when the request is rejected.
    Check {
        /// Path to engine configuration file; built-in defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Path to limits directive file
        #[arg(long)]
        policy: PathBuf,

        /// Requester DN; anonymous when omitted
        #[arg(long)]
        dn: Option<String>,

        /// Requested time limit in seconds (0 = unspecified)
        #[arg(long, default_value = "0")]
        time: u32,

        /// Requested size limit in entries (0 = unspecified)
        #[arg(long, default_value = "0")]
        size: u32,

        /// Request carries the paged-results control
        #[arg(long)]
        paged: bool,

        /// Requester holds administrative identity
        #[arg(long)]
        privileged: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
