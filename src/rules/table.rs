//! Rule Tables
//!
//! Rules are collected in a [`RuleTableBuilder`] while configuration is
//! loaded and then frozen into a [`RuleTable`]. The table has no mutating
//! methods; share it behind an `Arc` once built.

use serde::Serialize;
use tracing::debug;

use super::LimitRule;
use crate::limits::{CompileError, CompileResult, LimitSet};

/// Ordered, immutable rule table with its default limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleTable {
    rules: Vec<LimitRule>,
    default: LimitSet,
}

impl RuleTable {
    /// Table with no rules, resolving everything to `default`
    pub fn with_default(default: LimitSet) -> Self {
        Self {
            rules: Vec::new(),
            default: default.coerced(),
        }
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[LimitRule] {
        &self.rules
    }

    /// Limits applied when no rule matches
    pub fn default_limits(&self) -> &LimitSet {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::with_default(LimitSet::server_defaults())
    }
}

/// Append-only builder for a [`RuleTable`]
#[derive(Debug, Clone)]
pub struct RuleTableBuilder {
    rules: Vec<LimitRule>,
    default: LimitSet,
}

impl RuleTableBuilder {
    /// Builder seeded with [`LimitSet::server_defaults`]
    pub fn new() -> Self {
        Self::with_default(LimitSet::server_defaults())
    }

    pub fn with_default(default: LimitSet) -> Self {
        Self {
            rules: Vec::new(),
            default: default.coerced(),
        }
    }

    /// Current default; new directives start from it
    pub fn default_limits(&self) -> &LimitSet {
        &self.default
    }

    /// Replace the default limits
    pub fn set_default_limits(&mut self, limits: LimitSet) {
        self.default = limits.coerced();
    }

    /// Append a rule.
    ///
    /// Fails if the rule is anonymous, users or `*` and a rule of that style
    /// is already present; the builder is left unchanged in that case.
    pub fn push(&mut self, rule: LimitRule) -> CompileResult<()> {
        let style = rule.style();
        if style.is_singleton() && self.rules.iter().any(|r| r.style() == style) {
            return Err(CompileError::DuplicateRule { style });
        }
        debug!(position = self.rules.len(), rule = %rule, "added limits rule");
        self.rules.push(rule);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Freeze into an immutable table
    pub fn build(self) -> RuleTable {
        RuleTable {
            rules: self.rules,
            default: self.default,
        }
    }
}

impl Default for RuleTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}
