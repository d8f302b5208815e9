//! Schema catalog: every policy schema in a namespace, with its editable fields.

use crate::api::wire::{FieldDefinitionRecord, SchemaRecord};
use crate::api::{collect_pages, PolicyBackend};
use crate::error::PolicyError;
use crate::model::{FieldDescription, KnownValue, PolicySchema, TargetKey, DEFAULT_INHERITED_OU};
use tracing::{debug, instrument};

const OPTIONAL_LABEL: &str = "LABEL_OPTIONAL";
const UNSPECIFIED_TYPE: &str = "TYPE_UNSPECIFIED";

/// Fetch all schemas for `namespace`, following page tokens, in server order.
#[instrument(skip(backend))]
pub async fn fetch_catalog(
    backend: &dyn PolicyBackend,
    namespace: &str,
) -> Result<Vec<PolicySchema>, PolicyError> {
    let records = collect_pages(|token: Option<String>| async move {
        backend.list_schemas(namespace, token.as_deref()).await
    })
    .await?;

    let catalog: Vec<PolicySchema> = records.into_iter().map(schema_from_record).collect();
    debug!(schemas = catalog.len(), "catalog loaded");
    Ok(catalog)
}

/// Flatten a schema listing entry into the form the console edits.
///
/// Field type and required-ness come from the first message type of the
/// schema definition; a field without a definition is treated as optional
/// and untyped.
pub fn schema_from_record(record: SchemaRecord) -> PolicySchema {
    let definitions: &[FieldDefinitionRecord] = record
        .definition
        .as_ref()
        .and_then(|d| d.message_type.first())
        .map(|m| m.field.as_slice())
        .unwrap_or(&[]);

    let fields = record
        .field_descriptions
        .iter()
        .map(|field| {
            let definition = definitions.iter().find(|d| d.name == field.field);
            FieldDescription {
                name: field.field.clone(),
                description: field.description.clone(),
                field_type: definition
                    .map(|d| d.field_type.clone())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| UNSPECIFIED_TYPE.to_string()),
                required: definition.is_some_and(|d| d.label != OPTIONAL_LABEL),
                value: field.default_value.clone(),
                known_values: field
                    .known_value_descriptions
                    .iter()
                    .map(|kv| KnownValue {
                        value: kv.value.clone(),
                        description: kv.description.clone(),
                    })
                    .collect(),
            }
        })
        .collect();

    let target_keys = record.additional_target_key_names.map(|keys| {
        keys.into_iter()
            .map(|k| TargetKey {
                name: k.key,
                values: Vec::new(),
            })
            .collect()
    });

    PolicySchema {
        schema_name: record.schema_name,
        category_title: record.category_title,
        description: record.policy_description,
        lifecycle_stage: record
            .policy_api_lifecycle
            .map(|l| l.policy_api_lifecycle_stage)
            .unwrap_or_default(),
        target_keys,
        fields,
        inherited_ou: DEFAULT_INHERITED_OU.to_string(),
    }
}
