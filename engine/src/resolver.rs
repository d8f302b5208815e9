use crate::api::wire::ResolvedPolicyRecord;
use crate::api::{collect_pages, PolicyBackend};
use crate::error::PolicyError;
use crate::model::{target_resource, ResolvedPolicyValue};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Effective values of every schema under `namespace` for one org unit.
///
/// Empty when nothing in the namespace is set anywhere along the OU's
/// ancestry. At most one value per schema name is returned; see
/// [`fold_duplicates`].
#[instrument(skip(backend))]
pub async fn resolve_policies(
    backend: &dyn PolicyBackend,
    ou_id: &str,
    namespace: &str,
) -> Result<Vec<ResolvedPolicyValue>, PolicyError> {
    let target = target_resource(ou_id);
    let filter = format!("{}.*", namespace);

    let records = collect_pages(|token: Option<String>| {
        let target = target.as_str();
        let filter = filter.as_str();
        async move { backend.resolve(target, filter, token.as_deref()).await }
    })
    .await?;

    let resolved = fold_duplicates(records.into_iter().filter_map(resolved_from_record));

    debug!(resolved = resolved.len(), "policies resolved");
    Ok(resolved)
}

/// Collapse repeated schema names into one value, applied in arrival order:
/// later records overwrite earlier field values and take over the source OU.
/// Each schema keeps the position of its first occurrence.
pub fn fold_duplicates(
    values: impl IntoIterator<Item = ResolvedPolicyValue>,
) -> Vec<ResolvedPolicyValue> {
    let mut folded: Vec<ResolvedPolicyValue> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for value in values {
        match index.get(&value.schema_name) {
            Some(&i) => {
                debug!(schema = %value.schema_name, source = %value.source_ou, "duplicate resolved value folded");
                let existing = &mut folded[i];
                existing.source_ou = value.source_ou;
                existing.values.extend(value.values);
            }
            None => {
                index.insert(value.schema_name.clone(), folded.len());
                folded.push(value);
            }
        }
    }
    folded
}

/// `None` for records that carry no policy value.
pub fn resolved_from_record(record: ResolvedPolicyRecord) -> Option<ResolvedPolicyValue> {
    let value = record.value?;
    if value.policy_schema.is_empty() {
        return None;
    }

    let source_ou = record
        .source_key
        .map(|key| source_ou_from_resource(&key.target_resource).to_string())
        .unwrap_or_default();

    Some(ResolvedPolicyValue {
        schema_name: value.policy_schema,
        source_ou,
        values: value.value,
    })
}

/// `orgunits/123` → `123`.
pub fn source_ou_from_resource(target_resource: &str) -> &str {
    target_resource.rsplit('/').next().unwrap_or(target_resource)
}
