//! Directive Compiler
//!
//! Turns tokenized policy directives into rules on a [`RuleTableBuilder`].
//!
//! # Directives
//!
//! ```text
//! limits <pattern> <limit-spec> [<limit-spec> ...]
//! sizelimit {<integer>|unlimited|none|size[.qualifier]=<value>} ...
//! timelimit {<integer>|unlimited|none|time[.qualifier]=<value>} ...
//! ```
//!
//! `sizelimit` and `timelimit` change the table default, which every later
//! `limits` directive starts from. A directive that fails leaves the builder
//! untouched.

use tracing::debug;

use crate::directory::Schema;
use crate::dn::DnNormalizer;
use crate::limits::{CompileError, CompileResult, Limit, LimitKind, LimitSet};
use crate::rules::{LimitRule, RuleTableBuilder};

mod limit_spec;
mod pattern;
mod source;

pub use limit_spec::apply_limit_spec;
pub use source::{load_directives, load_into, tokenize, LoadError, LoadResult};

use limit_spec::{parse_value, strip_prefix_ci};

/// Object class used by `group=` patterns unless configured otherwise
pub const DEFAULT_GROUP_OBJECT_CLASS: &str = "groupOfNames";

/// Membership attribute used by `group=` patterns unless configured otherwise
pub const DEFAULT_GROUP_MEMBER_ATTRIBUTE: &str = "member";

/// Directive compiler bound to the directory's normalizer and schema
pub struct Compiler<'a> {
    normalizer: &'a dyn DnNormalizer,
    schema: &'a dyn Schema,
    group_object_class: String,
    group_member_attribute: String,
}

impl<'a> Compiler<'a> {
    pub fn new(normalizer: &'a dyn DnNormalizer, schema: &'a dyn Schema) -> Self {
        Self {
            normalizer,
            schema,
            group_object_class: DEFAULT_GROUP_OBJECT_CLASS.to_string(),
            group_member_attribute: DEFAULT_GROUP_MEMBER_ATTRIBUTE.to_string(),
        }
    }

    /// Override the object class and attribute assumed by `group=` patterns
    pub fn with_group_defaults(
        mut self,
        object_class: impl Into<String>,
        member_attribute: impl Into<String>,
    ) -> Self {
        self.group_object_class = object_class.into();
        self.group_member_attribute = member_attribute.into();
        self
    }

    /// Compile any supported directive; `args[0]` is the directive keyword
    pub fn compile_directive<S: AsRef<str>>(
        &self,
        builder: &mut RuleTableBuilder,
        args: &[S],
    ) -> CompileResult<()> {
        let keyword = args.first().map(|arg| arg.as_ref()).unwrap_or("");
        if keyword.eq_ignore_ascii_case("limits") {
            self.compile_limits(builder, args)
        } else if keyword.eq_ignore_ascii_case("sizelimit") {
            self.compile_default(builder, LimitKind::Size, args)
        } else if keyword.eq_ignore_ascii_case("timelimit") {
            self.compile_default(builder, LimitKind::Time, args)
        } else {
            Err(CompileError::UnknownDirective {
                token: keyword.to_string(),
            })
        }
    }

    /// Compile `limits <pattern> <limit-spec>...` and append the rule
    pub fn compile_limits<S: AsRef<str>>(
        &self,
        builder: &mut RuleTableBuilder,
        args: &[S],
    ) -> CompileResult<()> {
        if args.len() < 3 {
            return Err(CompileError::MissingArguments {
                directive: "limits".to_string(),
            });
        }

        let pattern = self.parse_pattern(args[1].as_ref())?;

        let mut limits = *builder.default_limits();
        for token in &args[2..] {
            apply_limit_spec(token.as_ref(), &mut limits)?;
        }

        builder.push(LimitRule::new(pattern, limits))
    }

    /// Compile `sizelimit ...` or `timelimit ...` into the table default
    pub fn compile_default<S: AsRef<str>>(
        &self,
        builder: &mut RuleTableBuilder,
        kind: LimitKind,
        args: &[S],
    ) -> CompileResult<()> {
        let directive = match kind {
            LimitKind::Size => "sizelimit",
            LimitKind::Time => "timelimit",
        };
        if args.len() < 2 {
            return Err(CompileError::MissingArguments {
                directive: directive.to_string(),
            });
        }

        let mut limits = *builder.default_limits();
        for token in &args[1..] {
            let token = token.as_ref();
            if strip_prefix_ci(token, &kind.to_string()).is_some() {
                apply_limit_spec(token, &mut limits)?;
            } else {
                let soft = if token.eq_ignore_ascii_case("unlimited") {
                    Limit::Unlimited
                } else {
                    parse_value(token, false).ok_or_else(|| CompileError::invalid_limit(token))?
                };
                set_soft(&mut limits, kind, soft);
            }
        }

        debug!(directive, limits = %limits, "updated default limits");
        builder.set_default_limits(limits);
        Ok(())
    }
}

fn set_soft(limits: &mut LimitSet, kind: LimitKind, soft: Limit) {
    match kind {
        LimitKind::Time => {
            limits.time_soft = soft;
            limits.time_hard = Limit::Inherit;
        }
        LimitKind::Size => {
            limits.size_soft = soft;
            limits.size_hard = Limit::Inherit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticSchema;
    use crate::dn::SimpleDnNormalizer;
    use crate::rules::{Pattern, PatternStyle};

    fn schema() -> StaticSchema {
        StaticSchema::new(["groupOfNames"], ["member"])
    }

    #[test]
    fn test_limits_directive_appends_rule() {
        let schema = schema();
        let compiler = Compiler::new(&SimpleDnNormalizer, &schema);
        let mut builder = RuleTableBuilder::new();

        compiler
            .compile_directive(
                &mut builder,
                &["limits", "dn.subtree=dc=example,dc=com", "size=100", "size.hard=500"],
            )
            .unwrap();

        let table = builder.build();
        let rule = &table.rules()[0];
        assert_eq!(rule.style(), PatternStyle::Subtree);
        assert_eq!(rule.limits().size_soft, Limit::bounded(100));
        assert_eq!(rule.limits().size_hard, Limit::bounded(500));
        // untouched bounds come from the default
        assert_eq!(rule.limits().time_soft, Limit::bounded(3600));
    }

    #[test]
    fn test_limits_seeded_from_current_default() {
        let schema = schema();
        let compiler = Compiler::new(&SimpleDnNormalizer, &schema);
        let mut builder = RuleTableBuilder::new();

        compiler
            .compile_directive(&mut builder, &["timelimit", "time.soft=60", "time.hard=120"])
            .unwrap();
        compiler
            .compile_directive(&mut builder, &["limits", "users", "size=10"])
            .unwrap();

        let table = builder.build();
        let limits = table.rules()[0].limits();
        assert_eq!(limits.time_soft, Limit::bounded(60));
        assert_eq!(limits.time_hard, Limit::bounded(120));
        assert_eq!(limits.size_soft, Limit::bounded(10));
    }

    #[test]
    fn test_unchecked_and_paged_options() {
        let schema = schema();
        let compiler = Compiler::new(&SimpleDnNormalizer, &schema);
        let mut builder = RuleTableBuilder::new();

        compiler
            .compile_directive(
                &mut builder,
                &["limits", "users", "size.unchecked=1000", "size.pr=noEstimate"],
            )
            .unwrap();
        compiler
            .compile_directive(&mut builder, &["limits", "anonymous", "size.pr=20"])
            .unwrap();

        let table = builder.build();
        let users = table.rules()[0].limits();
        assert_eq!(users.unchecked_size(), Limit::bounded(1000));
        assert!(users.hide_page_estimate());
        assert_eq!(users.size_page, Limit::Inherit);

        let anonymous = table.rules()[1].limits();
        assert_eq!(anonymous.unchecked_size(), Limit::Inherit);
        assert!(!anonymous.hide_page_estimate());
        assert_eq!(anonymous.size_page, Limit::bounded(20));
    }

    #[test]
    fn test_failed_directive_adds_nothing() {
        let schema = schema();
        let compiler = Compiler::new(&SimpleDnNormalizer, &schema);
        let mut builder = RuleTableBuilder::new();

        let err = compiler
            .compile_limits(&mut builder, &["limits", "*", "size=10", "size.hard=bogus"])
            .unwrap_err();
        assert_eq!(err.token(), Some("size.hard=bogus"));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_missing_arguments() {
        let schema = schema();
        let compiler = Compiler::new(&SimpleDnNormalizer, &schema);
        let mut builder = RuleTableBuilder::new();

        assert!(matches!(
            compiler.compile_limits(&mut builder, &["limits", "*"]),
            Err(CompileError::MissingArguments { .. })
        ));
        assert!(matches!(
            compiler.compile_directive(&mut builder, &["sizelimit"]),
            Err(CompileError::MissingArguments { .. })
        ));
    }

    #[test]
    fn test_second_any_rule_rejected() {
        let schema = schema();
        let compiler = Compiler::new(&SimpleDnNormalizer, &schema);
        let mut builder = RuleTableBuilder::new();

        compiler
            .compile_limits(&mut builder, &["limits", "*", "size=10"])
            .unwrap();
        let err = compiler
            .compile_limits(&mut builder, &["limits", "dn.regex=.*", "size=20"])
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::DuplicateRule {
                style: PatternStyle::Any
            }
        ));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_hard_coerced_at_compile_time() {
        let schema = schema();
        let compiler = Compiler::new(&SimpleDnNormalizer, &schema);
        let mut builder = RuleTableBuilder::new();

        compiler
            .compile_limits(&mut builder, &["limits", "anonymous", "size.soft=none", "size.hard=5"])
            .unwrap();
        compiler
            .compile_limits(&mut builder, &["limits", "users", "size.soft=10", "size.hard=0"])
            .unwrap();

        let table = builder.build();
        let anon = table.rules()[0].limits();
        assert_eq!(anon.size_soft, Limit::Unlimited);
        assert_eq!(anon.size_hard, Limit::Unlimited);
        let users = table.rules()[1].limits();
        assert_eq!(users.size_soft, Limit::bounded(10));
        assert_eq!(users.size_hard, Limit::Inherit);
    }

    #[test]
    fn test_default_directives() {
        let schema = schema();
        let compiler = Compiler::new(&SimpleDnNormalizer, &schema);
        let mut builder = RuleTableBuilder::new();

        compiler
            .compile_directive(&mut builder, &["sizelimit", "unlimited"])
            .unwrap();
        assert_eq!(builder.default_limits().size_soft, Limit::Unlimited);

        compiler
            .compile_directive(&mut builder, &["sizelimit", "250", "size.pr=50"])
            .unwrap();
        assert_eq!(builder.default_limits().size_soft, Limit::bounded(250));
        assert_eq!(builder.default_limits().size_page, Limit::bounded(50));

        compiler
            .compile_directive(&mut builder, &["timelimit", "none"])
            .unwrap();
        assert_eq!(builder.default_limits().time_soft, Limit::Unlimited);

        assert!(compiler
            .compile_directive(&mut builder, &["timelimit", "size=10"])
            .is_err());
        assert_eq!(builder.default_limits().size_soft, Limit::bounded(250));
    }

    #[test]
    fn test_unknown_directive() {
        let schema = schema();
        let compiler = Compiler::new(&SimpleDnNormalizer, &schema);
        let mut builder = RuleTableBuilder::new();

        let err = compiler
            .compile_directive(&mut builder, &["access", "to", "*"])
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownDirective { .. }));
        assert_eq!(err.token(), Some("access"));
    }

    #[test]
    fn test_group_rule_compiles() {
        let schema = schema();
        let compiler = Compiler::new(&SimpleDnNormalizer, &schema);
        let mut builder = RuleTableBuilder::new();

        compiler
            .compile_limits(&mut builder, &["limits", "group=cn=Admins,dc=example,dc=com", "time=none"])
            .unwrap();
        let table = builder.build();
        assert!(matches!(table.rules()[0].pattern(), Pattern::Group(_)));
    }
}
