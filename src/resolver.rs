//! Limit Resolution
//!
//! Picks the limits that apply to a requester: the first rule in table order
//! whose pattern matches the requester's normalized DN, or the table default.
//! There is no best-match scoring; specific rules must precede broad ones.
//!
//! An empty DN is the anonymous identity. Only `anonymous` and `*` rules can
//! match it.

use tracing::{debug, warn};

use crate::directory::GroupMembership;
use crate::dn;
use crate::limits::LimitSet;
use crate::rules::{GroupPattern, LimitRule, Pattern, PatternStyle, RuleTable};

/// Limits for `requester_dn`; falls back to the table default
pub fn resolve<'t>(
    table: &'t RuleTable,
    requester_dn: &str,
    groups: &dyn GroupMembership,
) -> &'t LimitSet {
    resolve_rule(table, requester_dn, groups)
        .map(LimitRule::limits)
        .unwrap_or_else(|| table.default_limits())
}

/// First rule matching `requester_dn`, if any
pub fn resolve_rule<'t>(
    table: &'t RuleTable,
    requester_dn: &str,
    groups: &dyn GroupMembership,
) -> Option<&'t LimitRule> {
    let found = table
        .rules()
        .iter()
        .enumerate()
        .find(|(_, rule)| rule_matches(rule, requester_dn, groups));

    match found {
        Some((position, rule)) => {
            debug!(requester = requester_dn, position, rule = %rule, "limits rule matched");
            Some(rule)
        }
        None => {
            debug!(requester = requester_dn, "no limits rule matched, using default");
            None
        }
    }
}

/// Whether a single rule applies to `requester_dn`
pub fn rule_matches(rule: &LimitRule, requester_dn: &str, groups: &dyn GroupMembership) -> bool {
    match rule.pattern() {
        Pattern::Exact(pattern) => !requester_dn.is_empty() && requester_dn == pattern,
        Pattern::Group(group) => {
            !requester_dn.is_empty()
                && (is_member(requester_dn, group, groups) || requester_dn == group.dn)
        }
        Pattern::OneLevel(pattern) => scope_matches(PatternStyle::OneLevel, pattern, requester_dn),
        Pattern::Subtree(pattern) => scope_matches(PatternStyle::Subtree, pattern, requester_dn),
        Pattern::Children(pattern) => scope_matches(PatternStyle::Children, pattern, requester_dn),
        Pattern::Regex(regex) => !requester_dn.is_empty() && regex.is_match(requester_dn),
        Pattern::Anonymous => requester_dn.is_empty(),
        Pattern::Users => !requester_dn.is_empty(),
        Pattern::Any => true,
    }
}

/// Hierarchical comparison for onelevel, subtree and children patterns.
///
/// The pattern must be a suffix of the requester that starts right after an
/// unescaped RDN separator, so `dc=example,dc=com` never matches
/// `dc=myexample,dc=com`. Only subtree includes the pattern entry itself.
fn scope_matches(style: PatternStyle, pattern: &str, requester_dn: &str) -> bool {
    if requester_dn.is_empty() || requester_dn.len() < pattern.len() {
        return false;
    }

    let requester = requester_dn.as_bytes();
    let d = requester.len() - pattern.len();

    if d == 0 {
        if style != PatternStyle::Subtree {
            return false;
        }
    } else if !dn::is_unescaped_separator(requester, d - 1) {
        return false;
    }

    if &requester[d..] != pattern.as_bytes() {
        return false;
    }

    // onelevel: the part before the separator is a single RDN
    if style == PatternStyle::OneLevel && dn::first_rdn_len(requester_dn) != d - 1 {
        return false;
    }

    true
}

fn is_member(requester_dn: &str, group: &GroupPattern, groups: &dyn GroupMembership) -> bool {
    match groups.is_member(requester_dn, &group.dn, &group.object_class, &group.attribute) {
        Ok(member) => member,
        Err(err) => {
            warn!(
                requester = requester_dn,
                group = %group.dn,
                error = %err,
                "group membership lookup failed, treating as non-member"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{AttributeTypeRef, MembershipError, ObjectClassRef, StaticGroups};
    use crate::limits::Limit;
    use crate::rules::RuleTableBuilder;

    const BASE: &str = "dc=example,dc=com";

    fn limits(size: u32) -> LimitSet {
        LimitSet {
            size_soft: Limit::bounded(size),
            ..LimitSet::default()
        }
    }

    fn table(patterns: Vec<Pattern>) -> RuleTable {
        let mut builder = RuleTableBuilder::with_default(limits(1));
        for (i, pattern) in patterns.into_iter().enumerate() {
            builder
                .push(LimitRule::new(pattern, limits(100 + i as u32)))
                .unwrap();
        }
        builder.build()
    }

    fn size_for(table: &RuleTable, dn: &str) -> Option<u32> {
        resolve(table, dn, &StaticGroups::new()).size_soft.value()
    }

    fn matches(pattern: Pattern, dn: &str) -> bool {
        let rule = LimitRule::new(pattern, LimitSet::default());
        rule_matches(&rule, dn, &StaticGroups::new())
    }

    #[test]
    fn test_subtree_includes_base() {
        assert!(matches(Pattern::Subtree(BASE.into()), BASE));
        assert!(!matches(Pattern::OneLevel(BASE.into()), BASE));
        assert!(!matches(Pattern::Children(BASE.into()), BASE));
    }

    #[test]
    fn test_onelevel_is_one_rdn_below() {
        let one = format!("cn=x,{}", BASE);
        let two = format!("cn=x,cn=y,{}", BASE);
        assert!(matches(Pattern::OneLevel(BASE.into()), &one));
        assert!(!matches(Pattern::OneLevel(BASE.into()), &two));
    }

    #[test]
    fn test_onelevel_with_escaped_comma_in_rdn() {
        let dn = format!(r"cn=smith\, j,{}", BASE);
        assert!(matches(Pattern::OneLevel(BASE.into()), &dn));
    }

    #[test]
    fn test_children_excludes_base() {
        assert!(matches(Pattern::Children(BASE.into()), &format!("cn=x,{}", BASE)));
        assert!(matches(
            Pattern::Children(BASE.into()),
            &format!("cn=x,cn=y,{}", BASE)
        ));
        assert!(!matches(Pattern::Children(BASE.into()), BASE));
    }

    #[test]
    fn test_suffix_requires_rdn_boundary() {
        assert!(!matches(Pattern::Subtree(BASE.into()), "dc=myexample,dc=com"));
        assert!(!matches(
            Pattern::Subtree("example,dc=com".into()),
            "cn=foo,dc=example,dc=com"
        ));
        assert!(!matches(
            Pattern::Subtree(BASE.into()),
            r"cn=x\,dc=example,dc=com"
        ));
    }

    #[test]
    fn test_shorter_requester_never_matches() {
        assert!(!matches(Pattern::Subtree(BASE.into()), "dc=com"));
    }

    #[test]
    fn test_exact_is_case_sensitive_and_excludes_anonymous() {
        let dn = format!("cn=admin,{}", BASE);
        assert!(matches(Pattern::Exact(dn.clone()), &dn));
        assert!(!matches(Pattern::Exact(dn.clone()), &dn.to_uppercase()));
        assert!(!matches(Pattern::Exact(String::new()), ""));
    }

    #[test]
    fn test_identity_keywords() {
        assert!(matches(Pattern::Anonymous, ""));
        assert!(!matches(Pattern::Anonymous, BASE));
        assert!(matches(Pattern::Users, BASE));
        assert!(!matches(Pattern::Users, ""));
        assert!(matches(Pattern::Any, ""));
        assert!(matches(Pattern::Any, BASE));
        assert!(!matches(Pattern::Subtree(BASE.into()), ""));
    }

    #[test]
    fn test_regex_unanchored_and_case_insensitive() {
        let pattern = Pattern::regex("OU=People").unwrap();
        assert!(matches(pattern.clone(), "uid=a,ou=people,dc=example,dc=com"));
        assert!(!matches(pattern, ""));
    }

    #[test]
    fn test_first_match_wins() {
        let table = table(vec![Pattern::Subtree(BASE.into()), Pattern::Any]);
        assert_eq!(size_for(&table, &format!("uid=a,ou=people,{}", BASE)), Some(100));
        assert_eq!(size_for(&table, "uid=a,dc=other,dc=org"), Some(101));
        assert_eq!(size_for(&table, ""), Some(101));
    }

    #[test]
    fn test_broad_rule_first_shadows_specific() {
        let table = table(vec![Pattern::Any, Pattern::Subtree(BASE.into())]);
        assert_eq!(size_for(&table, &format!("cn=x,{}", BASE)), Some(100));
    }

    #[test]
    fn test_default_when_nothing_matches() {
        let table = table(vec![Pattern::Users]);
        assert_eq!(size_for(&table, ""), Some(1));

        let empty = table_with_no_rules();
        assert_eq!(size_for(&empty, BASE), Some(1));
        assert!(resolve_rule(&empty, BASE, &StaticGroups::new()).is_none());
    }

    fn table_with_no_rules() -> RuleTable {
        RuleTableBuilder::with_default(limits(1)).build()
    }

    fn group_pattern() -> Pattern {
        Pattern::group(
            format!("cn=admins,{}", BASE),
            ObjectClassRef::new("groupOfNames"),
            AttributeTypeRef::new("member"),
        )
    }

    #[test]
    fn test_group_membership() {
        let mut groups = StaticGroups::new();
        groups.insert(
            format!("cn=admins,{}", BASE),
            ObjectClassRef::new("groupOfNames"),
            AttributeTypeRef::new("member"),
            [format!("uid=alice,{}", BASE)],
        );
        let rule = LimitRule::new(group_pattern(), LimitSet::default());

        assert!(rule_matches(&rule, &format!("uid=alice,{}", BASE), &groups));
        assert!(!rule_matches(&rule, &format!("uid=bob,{}", BASE), &groups));
        assert!(!rule_matches(&rule, "", &groups));
        // the group entry itself falls back to literal equality
        assert!(rule_matches(&rule, &format!("cn=admins,{}", BASE), &groups));
    }

    struct FailingGroups;

    impl GroupMembership for FailingGroups {
        fn is_member(
            &self,
            _requester_dn: &str,
            _group_dn: &str,
            _object_class: &ObjectClassRef,
            _attribute: &AttributeTypeRef,
        ) -> Result<bool, MembershipError> {
            Err(MembershipError::Backend("store unavailable".into()))
        }
    }

    #[test]
    fn test_membership_failure_falls_through() {
        let mut builder = RuleTableBuilder::with_default(limits(1));
        builder
            .push(LimitRule::new(group_pattern(), limits(100)))
            .unwrap();
        builder.push(LimitRule::new(Pattern::Users, limits(200))).unwrap();
        let table = builder.build();

        let resolved = resolve(&table, &format!("uid=alice,{}", BASE), &FailingGroups);
        assert_eq!(resolved.size_soft, Limit::bounded(200));
    }
}
