//! Domain types shared by the catalog, resolver, merge and submission steps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `inherited_ou` value for a schema whose fields still carry catalog defaults.
pub const DEFAULT_INHERITED_OU: &str = "default";

/// Root org unit path.
pub const ROOT_PATH: &str = "/";

/// Org unit ids arrive as `id:<opaque>`; API targets only use the opaque part.
pub fn ou_id_suffix(ou_id: &str) -> &str {
    ou_id.rsplit(':').next().unwrap_or(ou_id)
}

/// `orgunits/<opaque>` target resource for an org unit id.
pub fn target_resource(ou_id: &str) -> String {
    format!("orgunits/{}", ou_id_suffix(ou_id))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgUnit {
    pub id: String,
    pub path: String,
    pub parent_id: Option<String>,
}

impl OrgUnit {
    pub fn id_suffix(&self) -> &str {
        ou_id_suffix(&self.id)
    }

    pub fn is_root(&self) -> bool {
        self.path == ROOT_PATH
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownValue {
    pub value: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetKey {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescription {
    pub name: String,
    pub description: String,
    pub field_type: String,
    pub required: bool,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub known_values: Vec<KnownValue>,
}

/// One editable policy form: a schema plus the values currently shown for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySchema {
    pub schema_name: String,
    pub category_title: String,
    pub description: String,
    pub lifecycle_stage: String,
    pub target_keys: Option<Vec<TargetKey>>,
    pub fields: Vec<FieldDescription>,
    pub inherited_ou: String,
}

impl PolicySchema {
    pub fn field(&self, name: &str) -> Option<&FieldDescription> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn is_default(&self) -> bool {
        self.inherited_ou == DEFAULT_INHERITED_OU
    }
}

/// Effective value of one schema for a queried org unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPolicyValue {
    pub schema_name: String,
    /// Opaque id of the org unit the value is set on.
    pub source_ou: String,
    pub values: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTargetKey {
    pub target_resource: String,
}

impl PolicyTargetKey {
    pub fn for_org_unit(ou_id: &str) -> Self {
        Self {
            target_resource: target_resource(ou_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyValue {
    pub policy_schema: String,
    pub value: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyRequest {
    pub policy_target_key: PolicyTargetKey,
    pub policy_value: PolicyValue,
    pub update_mask: String,
}

impl ModifyRequest {
    pub fn schema_name(&self) -> &str {
        &self.policy_value.policy_schema
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InheritRequest {
    pub policy_target_key: PolicyTargetKey,
    pub policy_schema: String,
}
