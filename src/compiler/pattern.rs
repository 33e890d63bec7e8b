//! Pattern parsing
//!
//! ```text
//! "*" | "anonymous" | "users"
//! "dn" ["." scope] "=" <dn>
//! "group" ["/" objectClass ["/" attributeType]] "=" <dn>
//! ```

use tracing::warn;

use super::limit_spec::strip_prefix_ci;
use super::Compiler;
use crate::limits::{CompileError, CompileResult};
use crate::rules::{DnRegex, Pattern, PatternStyle};

impl Compiler<'_> {
    /// Parse the pattern token of a `limits` directive
    pub fn parse_pattern(&self, token: &str) -> CompileResult<Pattern> {
        if token == "*" {
            return Ok(Pattern::Any);
        }
        if token.eq_ignore_ascii_case("anonymous") {
            return Ok(Pattern::Anonymous);
        }
        if token.eq_ignore_ascii_case("users") {
            return Ok(Pattern::Users);
        }
        if let Some(rest) = strip_prefix_ci(token, "dn") {
            return self.parse_dn_pattern(token, rest);
        }
        if let Some(rest) = strip_prefix_ci(token, "group") {
            return self.parse_group_pattern(token, rest);
        }
        Err(CompileError::UnknownPattern {
            token: token.to_string(),
        })
    }

    fn parse_dn_pattern(&self, token: &str, rest: &str) -> CompileResult<Pattern> {
        let (style, rest) = match rest.strip_prefix('.') {
            Some(scoped) => parse_scope(token, scoped)?,
            None => (PatternStyle::Exact, rest),
        };

        if style == PatternStyle::Anonymous {
            return Ok(Pattern::Anonymous);
        }

        let value = rest
            .strip_prefix('=')
            .ok_or_else(|| CompileError::MissingEquals {
                token: token.to_string(),
            })?;

        if value == "*" || (style == PatternStyle::Regex && value == ".*") {
            return Ok(Pattern::Any);
        }

        if style == PatternStyle::Regex {
            return DnRegex::new(value)
                .map(Pattern::Regex)
                .map_err(|source| CompileError::InvalidRegex {
                    token: token.to_string(),
                    source,
                });
        }

        let dn = self.normalize_pattern_dn(token, value)?;
        Ok(match style {
            PatternStyle::OneLevel => Pattern::OneLevel(dn),
            PatternStyle::Subtree => Pattern::Subtree(dn),
            PatternStyle::Children => Pattern::Children(dn),
            _ => Pattern::Exact(dn),
        })
    }

    fn parse_group_pattern(&self, token: &str, rest: &str) -> CompileResult<Pattern> {
        let missing_equals = || CompileError::MissingEquals {
            token: token.to_string(),
        };
        let (names, value) = rest.split_once('=').ok_or_else(missing_equals)?;

        let (class_name, attr_name) = if names.is_empty() {
            (None, None)
        } else {
            let names = names.strip_prefix('/').ok_or_else(missing_equals)?;
            let mut parts = names.splitn(3, '/');
            let class_name = parts.next();
            let attr_name = parts.next();
            if parts.next().is_some() {
                return Err(CompileError::UnknownPattern {
                    token: token.to_string(),
                });
            }
            (class_name, attr_name)
        };

        let class_name = class_name.unwrap_or(self.group_object_class.as_str());
        let object_class = self.schema.find_object_class(class_name).ok_or_else(|| {
            CompileError::UnknownObjectClass {
                token: token.to_string(),
                name: class_name.to_string(),
            }
        })?;

        let attr_name = attr_name.unwrap_or(self.group_member_attribute.as_str());
        let attribute = self.schema.find_attribute_type(attr_name).ok_or_else(|| {
            CompileError::UnknownAttributeType {
                token: token.to_string(),
                name: attr_name.to_string(),
            }
        })?;

        let dn = self.normalize_pattern_dn(token, value)?;
        Ok(Pattern::group(dn, object_class, attribute))
    }

    fn normalize_pattern_dn(&self, token: &str, value: &str) -> CompileResult<String> {
        let dn = self
            .normalizer
            .normalize(value)
            .map_err(|e| CompileError::InvalidDn {
                token: token.to_string(),
                reason: e.to_string(),
            })?;
        if dn.is_empty() {
            return Err(CompileError::InvalidDn {
                token: token.to_string(),
                reason: "empty DN; use \"*\", \"users\" or \"anonymous\"".to_string(),
            });
        }
        Ok(dn)
    }
}

/// Split `scope[=...]` into the style and the remainder starting at `=`
fn parse_scope<'a>(token: &str, scoped: &'a str) -> CompileResult<(PatternStyle, &'a str)> {
    if let Some(rest) = strip_prefix_ci(scoped, "exact") {
        return Ok((PatternStyle::Exact, rest));
    }
    if let Some(rest) = strip_prefix_ci(scoped, "base") {
        return Ok((PatternStyle::Exact, rest));
    }
    if let Some(rest) = strip_prefix_ci(scoped, "one") {
        return Ok(match strip_prefix_ci(rest, "level") {
            Some(rest) => (PatternStyle::OneLevel, rest),
            None => {
                warn!(pattern = token, "deprecated \"one\" scope, use \"onelevel\" instead");
                (PatternStyle::OneLevel, rest)
            }
        });
    }
    if let Some(rest) = strip_prefix_ci(scoped, "sub") {
        return Ok(match strip_prefix_ci(rest, "tree") {
            Some(rest) => (PatternStyle::Subtree, rest),
            None => {
                warn!(pattern = token, "deprecated \"sub\" scope, use \"subtree\" instead");
                (PatternStyle::Subtree, rest)
            }
        });
    }
    if let Some(rest) = strip_prefix_ci(scoped, "children") {
        return Ok((PatternStyle::Children, rest));
    }
    if let Some(rest) = strip_prefix_ci(scoped, "regex") {
        return Ok((PatternStyle::Regex, rest));
    }
    if let Some(rest) = strip_prefix_ci(scoped, "anonymous") {
        return Ok((PatternStyle::Anonymous, rest));
    }
    Err(CompileError::UnknownScope {
        token: token.to_string(),
    })
}
