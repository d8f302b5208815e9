//! Response and request bodies as the policy and directory APIs spell them.
//!
//! Everything is `#[serde(default)]`-tolerant: the APIs omit empty lists and
//! unset messages rather than sending nulls.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListSchemasResponse {
    pub policy_schemas: Vec<SchemaRecord>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaRecord {
    pub name: String,
    pub schema_name: String,
    pub category_title: String,
    pub policy_description: String,
    pub policy_api_lifecycle: Option<LifecycleRecord>,
    pub additional_target_key_names: Option<Vec<TargetKeyRecord>>,
    pub field_descriptions: Vec<FieldDescriptionRecord>,
    pub definition: Option<DefinitionRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleRecord {
    pub policy_api_lifecycle_stage: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetKeyRecord {
    pub key: String,
    pub key_description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDescriptionRecord {
    pub field: String,
    pub description: String,
    pub default_value: Value,
    pub known_value_descriptions: Vec<KnownValueRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KnownValueRecord {
    pub value: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefinitionRecord {
    pub message_type: Vec<MessageTypeRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageTypeRecord {
    pub name: String,
    pub field: Vec<FieldDefinitionRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDefinitionRecord {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest<'a> {
    pub policy_target_key: TargetResourceRef<'a>,
    pub policy_schema_filter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResourceRef<'a> {
    pub target_resource: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolveResponse {
    pub resolved_policies: Vec<ResolvedPolicyRecord>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolvedPolicyRecord {
    pub target_key: Option<TargetKeyRef>,
    pub value: Option<PolicyValueRecord>,
    pub source_key: Option<TargetKeyRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetKeyRef {
    pub target_resource: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyValueRecord {
    pub policy_schema: String,
    pub value: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrgUnitsResponse {
    pub organization_units: Vec<OrgUnitRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrgUnitRecord {
    pub org_unit_id: String,
    pub org_unit_path: String,
    pub parent_org_unit_id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest<'a, T> {
    pub requests: &'a [T],
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    pub message: String,
}
