//! Limit Sets
//!
//! The enforceable size/time policy bound to a rule.
//!
//! # Sentinels
//!
//! Every bound is a [`Limit`]:
//!
//! - `Inherit`: nothing configured, defer to the request (or to the soft bound
//!   when used as a hard bound)
//! - `Unlimited`: no restriction at all
//! - `Bounded(n)`: seconds for time bounds, entries for size bounds
//!
//! In directive text these are written `0`, `none` and `n`; the legacy integer
//! encoding (`0`, `-1`, `n`) is kept for serialization.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

mod errors;
pub use errors::{CompileError, CompileResult, LimitValueError};

/// Default soft time limit in seconds for a fresh table
pub const DEFAULT_TIME_SOFT: u32 = 3600;

/// Default soft size limit in entries for a fresh table
pub const DEFAULT_SIZE_SOFT: u32 = 500;

/// A single soft or hard bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Limit {
    /// Not configured; defers to the request or to the soft bound
    #[default]
    Inherit,
    /// No restriction
    Unlimited,
    /// A finite, positive bound
    Bounded(NonZeroU32),
}

impl Limit {
    /// Build a bound from a count, mapping `0` to `Inherit`
    pub fn bounded(n: u32) -> Self {
        NonZeroU32::new(n).map_or(Limit::Inherit, Limit::Bounded)
    }

    /// Decode the legacy integer encoding
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            -1 => Some(Limit::Unlimited),
            0 => Some(Limit::Inherit),
            n if n > 0 => u32::try_from(n).ok().map(Limit::bounded),
            _ => None,
        }
    }

    /// Encode as the legacy integer form (`-1`, `0`, `n`)
    pub fn as_raw(&self) -> i64 {
        match self {
            Limit::Inherit => 0,
            Limit::Unlimited => -1,
            Limit::Bounded(n) => i64::from(n.get()),
        }
    }

    /// Finite value, if any
    pub fn value(&self) -> Option<u32> {
        match self {
            Limit::Bounded(n) => Some(n.get()),
            _ => None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    pub fn is_inherit(&self) -> bool {
        matches!(self, Limit::Inherit)
    }

    /// Whether a positive requested value lies strictly above this bound
    ///
    /// `Inherit` counts as zero and `Unlimited` as below every request, which
    /// is how the hard-bound comparison reads in the enforcement path.
    pub(crate) fn is_below(&self, requested: u32) -> bool {
        match self {
            Limit::Inherit | Limit::Unlimited => true,
            Limit::Bounded(n) => requested > n.get(),
        }
    }
}

impl From<Limit> for i64 {
    fn from(limit: Limit) -> Self {
        limit.as_raw()
    }
}

impl TryFrom<i64> for Limit {
    type Error = LimitValueError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Limit::from_raw(raw).ok_or(LimitValueError(raw))
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Inherit => write!(f, "0"),
            Limit::Unlimited => write!(f, "none"),
            Limit::Bounded(n) => write!(f, "{}", n),
        }
    }
}

/// Which limit a decision is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    Time,
    Size,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitKind::Time => write!(f, "time"),
            LimitKind::Size => write!(f, "size"),
        }
    }
}

/// The enforceable policy attached to a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LimitSet {
    /// Time limit applied when the client asks for none (seconds)
    pub time_soft: Limit,
    /// Ceiling for a client-requested time limit
    pub time_hard: Limit,
    /// Size limit applied when the client asks for none (entries)
    pub size_soft: Limit,
    /// Ceiling for a client-requested size limit
    pub size_hard: Limit,
    /// Maximum number of candidates a search may examine unindexed
    pub size_unchecked: Limit,
    /// Size limit used under paged results; `Inherit` falls back to `size_soft`
    pub size_page: Limit,
    /// Suppress the size estimate in paged-results responses
    pub hide_page_estimate: bool,
}

impl LimitSet {
    /// Defaults a freshly created table starts from
    pub fn server_defaults() -> Self {
        Self {
            time_soft: Limit::bounded(DEFAULT_TIME_SOFT),
            size_soft: Limit::bounded(DEFAULT_SIZE_SOFT),
            ..Self::default()
        }
    }

    /// Apply the soft/hard sanity rule to both time and size.
    ///
    /// A positive hard bound below the soft bound, or next to an unlimited
    /// soft bound, is replaced by the soft bound.
    pub fn coerce_hard_bounds(&mut self) {
        self.time_hard = coerce_hard(self.time_soft, self.time_hard);
        self.size_hard = coerce_hard(self.size_soft, self.size_hard);
    }

    /// Copy with [`coerce_hard_bounds`](Self::coerce_hard_bounds) applied
    pub fn coerced(mut self) -> Self {
        self.coerce_hard_bounds();
        self
    }

    pub fn soft(&self, kind: LimitKind) -> Limit {
        match kind {
            LimitKind::Time => self.time_soft,
            LimitKind::Size => self.size_soft,
        }
    }

    pub fn hard(&self, kind: LimitKind) -> Limit {
        match kind {
            LimitKind::Time => self.time_hard,
            LimitKind::Size => self.size_hard,
        }
    }

    pub fn unchecked_size(&self) -> Limit {
        self.size_unchecked
    }

    pub fn hide_page_estimate(&self) -> bool {
        self.hide_page_estimate
    }
}

fn coerce_hard(soft: Limit, hard: Limit) -> Limit {
    match (soft, hard) {
        (Limit::Unlimited, Limit::Bounded(_)) => soft,
        (Limit::Bounded(s), Limit::Bounded(h)) if h < s => soft,
        _ => hard,
    }
}

impl fmt::Display for LimitSet {
    /// Renders every bound as a limit-spec token, so the text compiles back
    /// to this set whatever default is active. A directive can set
    /// `size.pr=noEstimate` but never clear it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time.soft={} time.hard={} size.soft={} size.hard={} size.unchecked={} size.pr={}",
            self.time_soft,
            HardBound(self.time_hard),
            self.size_soft,
            HardBound(self.size_hard),
            self.size_unchecked,
            self.size_page,
        )?;
        if self.hide_page_estimate {
            write!(f, " size.pr=noEstimate")?;
        }
        Ok(())
    }
}

/// Hard bounds spell `Inherit` as `soft`
struct HardBound(Limit);

impl fmt::Display for HardBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Limit::Inherit => write!(f, "soft"),
            limit => write!(f, "{}", limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_encoding() {
        assert_eq!(Limit::from_raw(-1), Some(Limit::Unlimited));
        assert_eq!(Limit::from_raw(0), Some(Limit::Inherit));
        assert_eq!(Limit::from_raw(42), Some(Limit::bounded(42)));
        assert_eq!(Limit::from_raw(-2), None);
        assert_eq!(Limit::from_raw(i64::from(u32::MAX) + 1), None);
        assert_eq!(Limit::bounded(7).as_raw(), 7);
        assert_eq!(Limit::Unlimited.as_raw(), -1);
    }

    #[test]
    fn test_hard_below_soft_is_coerced() {
        let set = LimitSet {
            size_soft: Limit::bounded(100),
            size_hard: Limit::bounded(50),
            ..LimitSet::default()
        }
        .coerced();
        assert_eq!(set.size_hard, Limit::bounded(100));
    }

    #[test]
    fn test_hard_next_to_unlimited_soft_is_coerced() {
        let set = LimitSet {
            time_soft: Limit::Unlimited,
            time_hard: Limit::bounded(5),
            ..LimitSet::default()
        }
        .coerced();
        assert_eq!(set.time_hard, Limit::Unlimited);
    }

    #[test]
    fn test_unset_hard_is_kept() {
        let set = LimitSet {
            size_soft: Limit::bounded(10),
            size_hard: Limit::Inherit,
            ..LimitSet::default()
        };
        assert_eq!(set.coerced(), set);
    }

    #[test]
    fn test_unlimited_hard_is_kept() {
        let set = LimitSet {
            size_soft: Limit::bounded(10),
            size_hard: Limit::Unlimited,
            ..LimitSet::default()
        };
        assert_eq!(set.coerced().size_hard, Limit::Unlimited);
    }

    #[test]
    fn test_serde_uses_raw_integers() {
        let set = LimitSet {
            time_soft: Limit::Unlimited,
            size_soft: Limit::bounded(20),
            ..LimitSet::default()
        };
        let json = serde_json::to_value(set).unwrap();
        assert_eq!(json["time_soft"], -1);
        assert_eq!(json["size_soft"], 20);
        assert_eq!(json["size_hard"], 0);

        let back: LimitSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_display_renders_limit_specs() {
        let set = LimitSet {
            time_soft: Limit::bounded(10),
            size_hard: Limit::Unlimited,
            hide_page_estimate: true,
            ..LimitSet::default()
        };
        assert_eq!(
            set.to_string(),
            "time.soft=10 time.hard=soft size.soft=0 size.hard=none \
             size.unchecked=0 size.pr=0 size.pr=noEstimate"
        );
    }
}
