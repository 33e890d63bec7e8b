//! Directory Collaborators
//!
//! Capabilities the engine consumes from the surrounding directory server:
//! schema lookup, group membership and result delivery. Static in-memory
//! implementations are provided for tooling and tests.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resolved reference to an object class, by canonical name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectClassRef(String);

impl ObjectClassRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved reference to an attribute type, by canonical name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeTypeRef(String);

impl AttributeTypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributeTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Schema lookup
pub trait Schema: Send + Sync {
    fn find_object_class(&self, name: &str) -> Option<ObjectClassRef>;

    fn find_attribute_type(&self, name: &str) -> Option<AttributeTypeRef>;
}

/// Group membership lookup failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MembershipError {
    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("group {group} is not a {object_class}")]
    ObjectClassMismatch { group: String, object_class: String },

    #[error("group {group} does not list members in {attribute}")]
    AttributeMismatch { group: String, attribute: String },

    #[error("membership lookup failed: {0}")]
    Backend(String),
}

/// Group membership lookup against the directory's data store.
///
/// May block. Callers treat any error as "not a member".
pub trait GroupMembership: Send + Sync {
    fn is_member(
        &self,
        requester_dn: &str,
        group_dn: &str,
        object_class: &ObjectClassRef,
        attribute: &AttributeTypeRef,
    ) -> Result<bool, MembershipError>;
}

/// Outcome codes the engine reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultCode {
    AdminLimitExceeded,
}

impl ResultCode {
    /// Protocol result code value
    pub fn code(&self) -> u32 {
        match self {
            ResultCode::AdminLimitExceeded => 11,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::AdminLimitExceeded => write!(f, "adminLimitExceeded"),
        }
    }
}

/// Result delivery back to the client
pub trait ResultSink {
    fn report(&self, operation_id: u64, code: ResultCode);
}

/// Schema backed by fixed name lists, matched case-insensitively
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    object_classes: HashMap<String, String>,
    attribute_types: HashMap<String, String>,
}

impl StaticSchema {
    pub fn new<C, A>(object_classes: C, attribute_types: A) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let index = |names: Vec<String>| {
            names
                .into_iter()
                .map(|name| (name.to_ascii_lowercase(), name))
                .collect::<HashMap<_, _>>()
        };
        Self {
            object_classes: index(object_classes.into_iter().map(Into::into).collect()),
            attribute_types: index(attribute_types.into_iter().map(Into::into).collect()),
        }
    }
}

impl Schema for StaticSchema {
    fn find_object_class(&self, name: &str) -> Option<ObjectClassRef> {
        self.object_classes
            .get(&name.to_ascii_lowercase())
            .map(ObjectClassRef::new)
    }

    fn find_attribute_type(&self, name: &str) -> Option<AttributeTypeRef> {
        self.attribute_types
            .get(&name.to_ascii_lowercase())
            .map(AttributeTypeRef::new)
    }
}

#[derive(Debug, Clone)]
struct StaticGroup {
    object_class: ObjectClassRef,
    attribute: AttributeTypeRef,
    members: HashSet<String>,
}

/// Group membership from configured member lists, keyed by normalized DN
#[derive(Debug, Clone, Default)]
pub struct StaticGroups {
    groups: HashMap<String, StaticGroup>,
}

impl StaticGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group; DNs are expected to be normalized already
    pub fn insert<I, S>(
        &mut self,
        group_dn: impl Into<String>,
        object_class: ObjectClassRef,
        attribute: AttributeTypeRef,
        members: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.insert(
            group_dn.into(),
            StaticGroup {
                object_class,
                attribute,
                members: members.into_iter().map(Into::into).collect(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl GroupMembership for StaticGroups {
    fn is_member(
        &self,
        requester_dn: &str,
        group_dn: &str,
        object_class: &ObjectClassRef,
        attribute: &AttributeTypeRef,
    ) -> Result<bool, MembershipError> {
        let group = self
            .groups
            .get(group_dn)
            .ok_or_else(|| MembershipError::GroupNotFound(group_dn.to_string()))?;

        if !group.object_class.name().eq_ignore_ascii_case(object_class.name()) {
            return Err(MembershipError::ObjectClassMismatch {
                group: group_dn.to_string(),
                object_class: object_class.to_string(),
            });
        }
        if !group.attribute.name().eq_ignore_ascii_case(attribute.name()) {
            return Err(MembershipError::AttributeMismatch {
                group: group_dn.to_string(),
                attribute: attribute.to_string(),
            });
        }
        Ok(group.members.contains(requester_dn))
    }
}

/// Sink that records every reported outcome
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(u64, ResultCode)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes reported so far, in order
    pub fn reports(&self) -> Vec<(u64, ResultCode)> {
        match self.reports.lock() {
            Ok(reports) => reports.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ResultSink for RecordingSink {
    fn report(&self, operation_id: u64, code: ResultCode) {
        match self.reports.lock() {
            Ok(mut reports) => reports.push((operation_id, code)),
            Err(poisoned) => poisoned.into_inner().push((operation_id, code)),
        }
    }
}
