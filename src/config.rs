//! Engine Configuration
//!
//! Service-level settings the limits engine needs besides the directives
//! themselves, loaded from TOML:
//!
//! ```toml
//! root_dn = "cn=manager,dc=example,dc=com"
//! group_object_class = "groupOfNames"
//! group_member_attribute = "member"
//!
//! [schema]
//! object_classes = ["groupOfNames", "groupOfUniqueNames"]
//! attribute_types = ["member", "uniqueMember"]
//!
//! [[groups]]
//! dn = "cn=admins,dc=example,dc=com"
//! members = ["uid=alice,dc=example,dc=com"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::compiler::{Compiler, DEFAULT_GROUP_MEMBER_ATTRIBUTE, DEFAULT_GROUP_OBJECT_CLASS};
use crate::config_validator::{format_validation_errors, ConfigValidationError, ConfigValidator};
use crate::directory::{Schema, StaticGroups, StaticSchema};
use crate::dn::DnNormalizer;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration:\n{}", format_validation_errors(.0))]
    Invalid(Vec<ConfigValidationError>),
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Requesters with this DN bypass all limits
    #[serde(default)]
    pub root_dn: Option<String>,

    /// Object class assumed by `group=` patterns without one
    #[serde(default = "default_group_object_class")]
    pub group_object_class: String,

    /// Membership attribute assumed by `group=` patterns without one
    #[serde(default = "default_group_member_attribute")]
    pub group_member_attribute: String,

    #[serde(default)]
    pub schema: SchemaConfig,

    /// Static group membership
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

fn default_group_object_class() -> String {
    DEFAULT_GROUP_OBJECT_CLASS.to_string()
}

fn default_group_member_attribute() -> String {
    DEFAULT_GROUP_MEMBER_ATTRIBUTE.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_dn: None,
            group_object_class: default_group_object_class(),
            group_member_attribute: default_group_member_attribute(),
            schema: SchemaConfig::default(),
            groups: Vec::new(),
        }
    }
}

/// Names known to the static schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub object_classes: Vec<String>,
    #[serde(default)]
    pub attribute_types: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            object_classes: vec![
                "groupOfNames".to_string(),
                "groupOfUniqueNames".to_string(),
                "organizationalRole".to_string(),
            ],
            attribute_types: vec![
                "member".to_string(),
                "uniqueMember".to_string(),
                "roleOccupant".to_string(),
            ],
        }
    }
}

/// One statically configured group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub dn: String,
    #[serde(default)]
    pub object_class: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

impl EngineConfig {
    /// Load and parse a TOML file; validation is separate
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check names against the schema and DNs against the normalizer
    pub fn validate(&self, normalizer: &dyn DnNormalizer) -> ConfigResult<()> {
        let schema = self.schema();
        let mut v = ConfigValidator::new();

        if let Some(root_dn) = &self.root_dn {
            v.validate_dn("root_dn", root_dn, normalizer);
        }
        v.validate_non_empty("group_object_class", &self.group_object_class)
            .validate_object_class("group_object_class", &self.group_object_class, &schema)
            .validate_non_empty("group_member_attribute", &self.group_member_attribute)
            .validate_attribute_type(
                "group_member_attribute",
                &self.group_member_attribute,
                &schema,
            );

        for (i, group) in self.groups.iter().enumerate() {
            v.validate_dn(&format!("groups[{}].dn", i), &group.dn, normalizer);
            v.validate_object_class(
                &format!("groups[{}].object_class", i),
                self.group_class(group),
                &schema,
            );
            v.validate_attribute_type(
                &format!("groups[{}].attribute", i),
                self.group_attribute(group),
                &schema,
            );
            for (j, member) in group.members.iter().enumerate() {
                v.validate_dn(&format!("groups[{}].members[{}]", i, j), member, normalizer);
            }
        }

        v.finish().map_err(ConfigError::Invalid)
    }

    /// Schema built from the configured names
    pub fn schema(&self) -> StaticSchema {
        StaticSchema::new(
            self.schema.object_classes.iter().cloned(),
            self.schema.attribute_types.iter().cloned(),
        )
    }

    /// Static membership with every DN normalized; call after [`validate`](Self::validate)
    pub fn groups(&self, normalizer: &dyn DnNormalizer) -> ConfigResult<StaticGroups> {
        let schema = self.schema();
        let mut groups = StaticGroups::new();
        for (i, group) in self.groups.iter().enumerate() {
            let invalid = |field: String, value: &str, message: String| {
                ConfigError::Invalid(vec![ConfigValidationError {
                    field,
                    value: value.to_string(),
                    message,
                }])
            };
            let dn = normalizer
                .normalize(&group.dn)
                .map_err(|e| invalid(format!("groups[{}].dn", i), &group.dn, e.to_string()))?;
            let class = self.group_class(group);
            let object_class = schema.find_object_class(class).ok_or_else(|| {
                invalid(
                    format!("groups[{}].object_class", i),
                    class,
                    "Unknown object class".to_string(),
                )
            })?;
            let attr = self.group_attribute(group);
            let attribute = schema.find_attribute_type(attr).ok_or_else(|| {
                invalid(
                    format!("groups[{}].attribute", i),
                    attr,
                    "Unknown attribute type".to_string(),
                )
            })?;
            let members = group
                .members
                .iter()
                .map(|member| {
                    normalizer.normalize(member).map_err(|e| {
                        invalid(format!("groups[{}].members", i), member, e.to_string())
                    })
                })
                .collect::<ConfigResult<Vec<_>>>()?;
            groups.insert(dn, object_class, attribute, members);
        }
        Ok(groups)
    }

    /// Normalized root DN, if configured
    pub fn normalized_root_dn(&self, normalizer: &dyn DnNormalizer) -> ConfigResult<Option<String>> {
        self.root_dn
            .as_deref()
            .map(|dn| {
                normalizer.normalize(dn).map_err(|e| {
                    ConfigError::Invalid(vec![ConfigValidationError {
                        field: "root_dn".to_string(),
                        value: dn.to_string(),
                        message: e.to_string(),
                    }])
                })
            })
            .transpose()
    }

    /// Compiler using this configuration's group defaults
    pub fn compiler<'a>(
        &self,
        normalizer: &'a dyn DnNormalizer,
        schema: &'a dyn Schema,
    ) -> Compiler<'a> {
        Compiler::new(normalizer, schema)
            .with_group_defaults(&self.group_object_class, &self.group_member_attribute)
    }

    fn group_class<'c>(&'c self, group: &'c GroupConfig) -> &'c str {
        group
            .object_class
            .as_deref()
            .unwrap_or(self.group_object_class.as_str())
    }

    fn group_attribute<'c>(&'c self, group: &'c GroupConfig) -> &'c str {
        group
            .attribute
            .as_deref()
            .unwrap_or(self.group_member_attribute.as_str())
    }
}
