//! Limit-spec parsing
//!
//! ```text
//! time[.{soft|hard}]=<value>
//! size[.{soft|hard|unchecked|pr}]=<value>
//! ```

use crate::limits::{CompileError, CompileResult, Limit, LimitKind, LimitSet};

/// Apply one limit-spec token to `limits`, returning which limit it touched.
///
/// On error `limits` may be partially updated; callers work on a copy.
pub fn apply_limit_spec(token: &str, limits: &mut LimitSet) -> CompileResult<LimitKind> {
    let invalid = || CompileError::invalid_limit(token);

    let (kind, rest) = if let Some(rest) = strip_prefix_ci(token, "time") {
        (LimitKind::Time, rest)
    } else if let Some(rest) = strip_prefix_ci(token, "size") {
        (LimitKind::Size, rest)
    } else {
        return Err(invalid());
    };

    if let Some(value) = rest.strip_prefix('=') {
        let soft = parse_value(value, false).ok_or_else(invalid)?;
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
        return Ok(kind);
    }

    let (qualifier, value) = rest
        .strip_prefix('.')
        .and_then(|q| q.split_once('='))
        .ok_or_else(invalid)?;

    let qualifier = qualifier.to_ascii_lowercase();
    match (kind, qualifier.as_str()) {
        (LimitKind::Time, "soft") => {
            limits.time_soft = parse_value(value, false).ok_or_else(invalid)?;
        }
        (LimitKind::Time, "hard") => {
            limits.time_hard = parse_value(value, true).ok_or_else(invalid)?;
        }
        (LimitKind::Size, "soft") => {
            limits.size_soft = parse_value(value, false).ok_or_else(invalid)?;
        }
        (LimitKind::Size, "hard") => {
            limits.size_hard = parse_value(value, true).ok_or_else(invalid)?;
        }
        (LimitKind::Size, "unchecked") => {
            limits.size_unchecked = parse_value(value, false).ok_or_else(invalid)?;
        }
        (LimitKind::Size, "pr") => {
            if value.eq_ignore_ascii_case("noEstimate") {
                limits.hide_page_estimate = true;
            } else {
                limits.size_page = parse_value(value, false).ok_or_else(invalid)?;
            }
        }
        _ => return Err(invalid()),
    }
    Ok(kind)
}

/// Parse `none`, an integer of at least `-1`, or `soft` where a hard bound
/// may defer to the soft one
pub(crate) fn parse_value(value: &str, allow_soft: bool) -> Option<Limit> {
    if value.eq_ignore_ascii_case("none") {
        return Some(Limit::Unlimited);
    }
    if allow_soft && value.eq_ignore_ascii_case("soft") {
        return Some(Limit::Inherit);
    }
    value.parse::<i64>().ok().and_then(Limit::from_raw)
}

pub(crate) fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(token: &str) -> CompileResult<LimitSet> {
        let mut limits = LimitSet::default();
        apply_limit_spec(token, &mut limits).map(|_| limits)
    }

    #[test]
    fn test_unqualified_sets_soft_and_resets_hard() {
        let mut limits = LimitSet {
            size_hard: Limit::bounded(900),
            ..LimitSet::default()
        };
        let kind = apply_limit_spec("size=100", &mut limits).unwrap();
        assert_eq!(kind, LimitKind::Size);
        assert_eq!(limits.size_soft, Limit::bounded(100));
        assert_eq!(limits.size_hard, Limit::Inherit);

        let limits = apply("time=none").unwrap();
        assert_eq!(limits.time_soft, Limit::Unlimited);
    }

    #[test]
    fn test_qualified_bounds() {
        let limits = apply("time.hard=30").unwrap();
        assert_eq!(limits.time_hard, Limit::bounded(30));

        let limits = apply("size.unchecked=1000").unwrap();
        assert_eq!(limits.size_unchecked, Limit::bounded(1000));

        let limits = apply("size.pr=20").unwrap();
        assert_eq!(limits.size_page, Limit::bounded(20));

        let limits = apply("SIZE.SOFT=NONE").unwrap();
        assert_eq!(limits.size_soft, Limit::Unlimited);
    }

    #[test]
    fn test_hard_soft_keyword() {
        let mut limits = LimitSet {
            time_hard: Limit::bounded(5),
            ..LimitSet::default()
        };
        apply_limit_spec("time.hard=soft", &mut limits).unwrap();
        assert_eq!(limits.time_hard, Limit::Inherit);

        assert!(apply("time.soft=soft").is_err());
        assert!(apply("size=soft").is_err());
    }

    #[test]
    fn test_no_estimate() {
        let limits = apply("size.pr=noEstimate").unwrap();
        assert!(limits.hide_page_estimate);
        assert_eq!(limits.size_page, Limit::Inherit);
    }

    #[test]
    fn test_minus_one_is_unlimited() {
        let limits = apply("size.hard=-1").unwrap();
        assert_eq!(limits.size_hard, Limit::Unlimited);
    }

    #[test]
    fn test_rejects_malformed_specs() {
        for token in [
            "size.soft=-2",
            "size.soft=abc",
            "size.soft=10abc",
            "size.soft=",
            "size.soft",
            "size.softer=10",
            "time.unchecked=10",
            "time.pr=10",
            "size.pr=estimate",
            "size:10",
            "sizes=10",
            "count=10",
            "ti",
        ] {
            let err = apply(token).unwrap_err();
            assert_eq!(err.token(), Some(token), "token {}", token);
        }
    }
}
