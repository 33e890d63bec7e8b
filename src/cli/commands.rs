//! CLI command implementations
//!
//! Each command loads the engine configuration and the directive file,
//! compiles a rule table, and writes JSON to stdout.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::compiler::load_directives;
use crate::config::EngineConfig;
use crate::directory::{ResultCode, ResultSink};
use crate::dn::{DnNormalizer, SimpleDnNormalizer};
use crate::enforcement::{Decision, Enforcer, SearchRequest};
use crate::rules::RuleTable;

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Exit code for an accepted request or a successful command
pub const EXIT_OK: i32 = 0;

/// Exit code for a request rejected with `adminLimitExceeded`
pub const EXIT_REJECTED: i32 = 2;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command, returning
/// the process exit code.
pub fn run() -> CliResult<i32> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<i32> {
    match cmd {
        Command::Rules { config, policy } => {
            let table = rules(config.as_deref(), &policy)?;
            write_json(&table)?;
            Ok(EXIT_OK)
        }
        Command::Check {
            config,
            policy,
            dn,
            time,
            size,
            paged,
            privileged,
        } => {
            let input = CheckInput {
                dn: dn.as_deref().unwrap_or(""),
                time,
                size,
                paged,
                privileged,
            };
            let decision = check(config.as_deref(), &policy, &input)?;
            write_json(&decision)?;
            Ok(if decision.is_accepted() {
                EXIT_OK
            } else {
                EXIT_REJECTED
            })
        }
    }
}

/// Request parameters for `check`
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckInput<'a> {
    /// Requester DN as given; normalized before use
    pub dn: &'a str,
    pub time: u32,
    pub size: u32,
    pub paged: bool,
    pub privileged: bool,
}

/// Compile the policy file into a rule table
pub fn rules(config_path: Option<&Path>, policy_path: &Path) -> CliResult<RuleTable> {
    let config = load_config(config_path)?;
    compile_policy(&config, policy_path)
}

/// Decide the limits for a single request
pub fn check(
    config_path: Option<&Path>,
    policy_path: &Path,
    input: &CheckInput<'_>,
) -> CliResult<Decision> {
    let normalizer = SimpleDnNormalizer;
    let config = load_config(config_path)?;
    let table = compile_policy(&config, policy_path)?;
    let groups = config.groups(&normalizer)?;

    let mut enforcer = Enforcer::new(Arc::new(table), Arc::new(groups));
    if let Some(root_dn) = config.normalized_root_dn(&normalizer)? {
        enforcer = enforcer.with_root_dn(root_dn);
    }

    let requester = normalizer.normalize(input.dn)?;
    let request = SearchRequest::new(0, &requester)
        .time_limit(input.time)
        .size_limit(input.size)
        .paged(input.paged)
        .privileged(input.privileged);

    Ok(enforcer.resolve_and_enforce(&request, &LogSink))
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => {
            info!("no configuration file given, using defaults");
            EngineConfig::default()
        }
    };
    config.validate(&SimpleDnNormalizer)?;
    Ok(config)
}

fn compile_policy(config: &EngineConfig, policy_path: &Path) -> CliResult<RuleTable> {
    let text = fs::read_to_string(policy_path).map_err(|source| CliError::Policy {
        path: policy_path.to_path_buf(),
        source,
    })?;

    let normalizer = SimpleDnNormalizer;
    let schema = config.schema();
    let compiler = config.compiler(&normalizer, &schema);
    load_directives(&compiler, &text).map_err(|source| CliError::Load {
        path: policy_path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Result delivery for one-shot checks: there is no client, so log it
struct LogSink;

impl ResultSink for LogSink {
    fn report(&self, operation_id: u64, code: ResultCode) {
        warn!(
            operation = operation_id,
            code = code.code(),
            "search rejected: {}",
            code
        );
    }
}
