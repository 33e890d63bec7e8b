//! Search Limit Enforcement
//!
//! Reconciles the limits a client asked for with the policy that applies to
//! it. The outcome is either the effective limits to install on the
//! operation, or a rejection with `adminLimitExceeded` when a request goes
//! past a positive hard bound.
//!
//! # Reconciliation
//!
//! For each of time and size, with `r` the requested value:
//!
//! - `r == 0`: the soft bound (for size under paged results, the page
//!   limit when one is set)
//! - `r` above an `Inherit` hard bound: clamp to the soft bound unless the
//!   soft bound is unlimited or not exceeded
//! - `r` above a finite hard bound: reject
//! - otherwise, including any `Unlimited` hard bound: `r` as requested
//!
//! Time is checked first; a rejected time limit ends processing.

use std::num::NonZeroU32;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::directory::{GroupMembership, ResultCode, ResultSink};
use crate::limits::{Limit, LimitKind, LimitSet};
use crate::resolver;
use crate::rules::RuleTable;

/// The parts of a search operation the engine looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRequest<'a> {
    /// Identifier passed back to the result sink
    pub operation_id: u64,
    /// Normalized requester DN; empty for anonymous
    pub requester_dn: &'a str,
    /// Requester holds administrative identity regardless of DN
    pub privileged: bool,
    /// Requested time limit in seconds, `0` when unspecified
    pub time_limit: u32,
    /// Requested size limit in entries, `0` when unspecified
    pub size_limit: u32,
    /// Paged-results control present
    pub paged: bool,
}

impl<'a> SearchRequest<'a> {
    pub fn new(operation_id: u64, requester_dn: &'a str) -> Self {
        Self {
            operation_id,
            requester_dn,
            privileged: false,
            time_limit: 0,
            size_limit: 0,
            paged: false,
        }
    }

    pub fn time_limit(mut self, seconds: u32) -> Self {
        self.time_limit = seconds;
        self
    }

    pub fn size_limit(mut self, entries: u32) -> Self {
        self.size_limit = entries;
        self
    }

    pub fn paged(mut self, paged: bool) -> Self {
        self.paged = paged;
        self
    }

    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Requested value for one kind of limit
    pub fn requested(&self, kind: LimitKind) -> u32 {
        match kind {
            LimitKind::Time => self.time_limit,
            LimitKind::Size => self.size_limit,
        }
    }
}

/// Terminal state of enforcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    /// Run the search with these limits
    Accepted {
        time: Limit,
        size: Limit,
        /// Resolved policy; absent for privileged requesters
        policy: Option<LimitSet>,
    },
    /// Refused with `adminLimitExceeded`; the search must not run
    Rejected {
        kind: LimitKind,
        requested: u32,
        hard: Limit,
    },
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted { .. })
    }

    /// Result code to deliver, if the decision carries one
    pub fn result_code(&self) -> Option<ResultCode> {
        match self {
            Decision::Accepted { .. } => None,
            Decision::Rejected { .. } => Some(ResultCode::AdminLimitExceeded),
        }
    }
}

/// Per-request limit enforcement over a published rule table
#[derive(Clone)]
pub struct Enforcer {
    table: Arc<RuleTable>,
    groups: Arc<dyn GroupMembership>,
    root_dn: Option<String>,
}

impl Enforcer {
    pub fn new(table: Arc<RuleTable>, groups: Arc<dyn GroupMembership>) -> Self {
        Self {
            table,
            groups,
            root_dn: None,
        }
    }

    /// Treat requests from this normalized DN as privileged
    pub fn with_root_dn(mut self, root_dn: impl Into<String>) -> Self {
        self.root_dn = Some(root_dn.into());
        self
    }

    pub fn is_privileged(&self, request: &SearchRequest<'_>) -> bool {
        request.privileged
            || self
                .root_dn
                .as_deref()
                .is_some_and(|root| !root.is_empty() && root == request.requester_dn)
    }

    /// Decide the effective limits without delivering anything
    pub fn enforce(&self, request: &SearchRequest<'_>) -> Decision {
        if self.is_privileged(request) {
            let decision = Decision::Accepted {
                time: unlimited_unless_requested(request.time_limit),
                size: unlimited_unless_requested(request.size_limit),
                policy: None,
            };
            debug!(operation = request.operation_id, ?decision, "privileged requester");
            return decision;
        }

        let policy = resolver::resolve(&self.table, request.requester_dn, self.groups.as_ref());
        let decision = enforce_policy(policy, request);
        debug!(
            operation = request.operation_id,
            requester = request.requester_dn,
            ?decision,
            "search limits decided"
        );
        decision
    }

    /// Decide the effective limits, reporting `adminLimitExceeded` through
    /// `sink` when the request is rejected
    pub fn resolve_and_enforce(
        &self,
        request: &SearchRequest<'_>,
        sink: &dyn ResultSink,
    ) -> Decision {
        let decision = self.enforce(request);
        if let Some(code) = decision.result_code() {
            sink.report(request.operation_id, code);
        }
        decision
    }
}

/// Apply a resolved policy to a non-privileged request
pub fn enforce_policy(policy: &LimitSet, request: &SearchRequest<'_>) -> Decision {
    let limits = effective_limit(policy, LimitKind::Time, request).and_then(|time| {
        effective_limit(policy, LimitKind::Size, request).map(|size| (time, size))
    });

    match limits {
        Ok((time, size)) => Decision::Accepted {
            time,
            size,
            policy: Some(*policy),
        },
        Err(rejected) => rejected,
    }
}

/// Effective bound of one kind, or the rejection it causes
fn effective_limit(
    policy: &LimitSet,
    kind: LimitKind,
    request: &SearchRequest<'_>,
) -> Result<Limit, Decision> {
    let requested = request.requested(kind);
    if kind == LimitKind::Size
        && requested == 0
        && request.paged
        && !policy.size_page.is_inherit()
    {
        return Ok(policy.size_page);
    }

    let hard = policy.hard(kind);
    reconcile(requested, policy.soft(kind), hard).ok_or(Decision::Rejected {
        kind,
        requested,
        hard,
    })
}

/// Reconcile one requested value with a soft/hard pair; `None` means the
/// request exceeds a finite hard bound
pub fn reconcile(requested: u32, soft: Limit, hard: Limit) -> Option<Limit> {
    let Some(requested) = NonZeroU32::new(requested) else {
        return Some(soft);
    };
    let as_requested = Limit::Bounded(requested);

    if !hard.is_below(requested.get()) {
        return Some(as_requested);
    }

    match hard {
        Limit::Inherit if !soft.is_unlimited() && soft.is_below(requested.get()) => Some(soft),
        Limit::Inherit | Limit::Unlimited => Some(as_requested),
        Limit::Bounded(_) => None,
    }
}

fn unlimited_unless_requested(requested: u32) -> Limit {
    match requested {
        0 => Limit::Unlimited,
        n => Limit::bounded(n),
    }
}
