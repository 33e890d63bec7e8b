//! Limit Rules
//!
//! A rule binds a [`LimitSet`] to an identity pattern. Patterns are a closed
//! set of variants: group membership only exists in its exact-DN form, and
//! only regex patterns carry a compiled expression.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};

use crate::directory::{AttributeTypeRef, ObjectClassRef};
use crate::limits::{CompileError, CompileResult, LimitSet};

mod table;
pub use table::{RuleTable, RuleTableBuilder};

/// How a pattern is compared against the requester DN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternStyle {
    Exact,
    OneLevel,
    Subtree,
    Children,
    Regex,
    Anonymous,
    Users,
    Any,
}

impl PatternStyle {
    /// Styles allowed at most once per table
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            PatternStyle::Anonymous | PatternStyle::Users | PatternStyle::Any
        )
    }
}

impl fmt::Display for PatternStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternStyle::Exact => "exact",
            PatternStyle::OneLevel => "onelevel",
            PatternStyle::Subtree => "subtree",
            PatternStyle::Children => "children",
            PatternStyle::Regex => "regex",
            PatternStyle::Anonymous => "anonymous",
            PatternStyle::Users => "users",
            PatternStyle::Any => "*",
        };
        f.write_str(name)
    }
}

/// What the pattern value names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The pattern is compared with the requester DN itself
    Plain,
    /// The pattern names a group the requester must belong to
    Group,
}

/// Case-insensitive, unanchored expression over requester DNs
#[derive(Debug, Clone)]
pub struct DnRegex {
    source: String,
    regex: Regex,
}

impl DnRegex {
    pub fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = RegexBuilder::new(&source).case_insensitive(true).build()?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, dn: &str) -> bool {
        self.regex.is_match(dn)
    }
}

impl PartialEq for DnRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for DnRegex {}

/// Group named by DN, with the membership check to run against it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPattern {
    pub dn: String,
    pub object_class: ObjectClassRef,
    pub attribute: AttributeTypeRef,
}

/// Identity pattern of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Requester DN equals the normalized DN
    Exact(String),
    /// Requester is exactly one level below the DN
    OneLevel(String),
    /// Requester is the DN or anywhere below it
    Subtree(String),
    /// Requester is anywhere below the DN, excluding the DN itself
    Children(String),
    /// Requester DN matches the expression
    Regex(DnRegex),
    /// Requester is a member of the group, or is the group entry itself
    Group(GroupPattern),
    /// Requester is anonymous
    Anonymous,
    /// Requester is authenticated
    Users,
    /// Every requester
    Any,
}

impl Pattern {
    /// Compile a regex pattern
    pub fn regex(source: &str) -> CompileResult<Self> {
        DnRegex::new(source)
            .map(Pattern::Regex)
            .map_err(|source_err| CompileError::InvalidRegex {
                token: source.to_string(),
                source: source_err,
            })
    }

    /// Group pattern; both schema references are required by construction
    pub fn group(
        dn: impl Into<String>,
        object_class: ObjectClassRef,
        attribute: AttributeTypeRef,
    ) -> Self {
        Pattern::Group(GroupPattern {
            dn: dn.into(),
            object_class,
            attribute,
        })
    }

    pub fn style(&self) -> PatternStyle {
        match self {
            Pattern::Exact(_) | Pattern::Group(_) => PatternStyle::Exact,
            Pattern::OneLevel(_) => PatternStyle::OneLevel,
            Pattern::Subtree(_) => PatternStyle::Subtree,
            Pattern::Children(_) => PatternStyle::Children,
            Pattern::Regex(_) => PatternStyle::Regex,
            Pattern::Anonymous => PatternStyle::Anonymous,
            Pattern::Users => PatternStyle::Users,
            Pattern::Any => PatternStyle::Any,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Pattern::Group(_) => Scope::Group,
            _ => Scope::Plain,
        }
    }

    /// Pattern value: the DN, the regex source, or nothing
    pub fn value(&self) -> Option<&str> {
        match self {
            Pattern::Exact(dn)
            | Pattern::OneLevel(dn)
            | Pattern::Subtree(dn)
            | Pattern::Children(dn) => Some(dn),
            Pattern::Group(group) => Some(&group.dn),
            Pattern::Regex(regex) => Some(regex.as_str()),
            Pattern::Anonymous | Pattern::Users | Pattern::Any => None,
        }
    }
}

impl fmt::Display for Pattern {
    /// Directive form of the pattern, quoted when it contains whitespace or
    /// quotes, with inner quotes escaped
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Pattern::Anonymous => return f.write_str("anonymous"),
            Pattern::Users => return f.write_str("users"),
            Pattern::Any => return f.write_str("*"),
            Pattern::Group(group) => format!(
                "group/{}/{}={}",
                group.object_class, group.attribute, group.dn
            ),
            other => format!(
                "dn.{}={}",
                other.style(),
                other.value().unwrap_or_default()
            ),
        };
        if token.contains(|c: char| c.is_whitespace() || c == '"') {
            write!(f, "\"{}\"", token.replace('"', "\\\""))
        } else {
            f.write_str(&token)
        }
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One policy binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitRule {
    pattern: Pattern,
    limits: LimitSet,
}

impl LimitRule {
    /// Bind limits to a pattern; the soft/hard rule is applied to the limits
    pub fn new(pattern: Pattern, limits: LimitSet) -> Self {
        Self {
            pattern,
            limits: limits.coerced(),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn limits(&self) -> &LimitSet {
        &self.limits
    }

    pub fn style(&self) -> PatternStyle {
        self.pattern.style()
    }
}

impl fmt::Display for LimitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "limits {} {}", self.pattern, self.limits)
    }
}
