//! dirlimits - per-identity search limits for directory servers
//!
//! Limit policies are written as `limits` directives, compiled into an
//! immutable [`RuleTable`], and consulted once per search: the first rule
//! whose pattern matches the requester's normalized DN supplies soft and
//! hard bounds, which [`Enforcer`] reconciles with what the client asked for.
//!
//! ```text
//! limits dn.subtree="ou=people,dc=example,dc=com" size=100 size.hard=500
//! limits group="cn=admins,dc=example,dc=com" size=none time=none
//! limits anonymous size=10 time=5
//! ```

pub mod cli;
pub mod compiler;
pub mod config;
pub mod config_validator;
pub mod directory;
pub mod dn;
pub mod enforcement;
pub mod limits;
pub mod resolver;
pub mod rules;

pub use compiler::{load_directives, Compiler, LoadError};
pub use config::{ConfigError, EngineConfig};
pub use directory::{GroupMembership, ResultCode, ResultSink, Schema};
pub use dn::{DnNormalizer, SimpleDnNormalizer};
pub use enforcement::{Decision, Enforcer, SearchRequest};
pub use limits::{CompileError, Limit, LimitKind, LimitSet};
pub use resolver::resolve;
pub use rules::{LimitRule, Pattern, PatternStyle, RuleTable, RuleTableBuilder};
