//! Overlay resolved values onto the schema catalog.
//!
//! The output always has exactly the catalog's schemas, in catalog order, so
//! the set of editable controls stays the same when the selected OU changes;
//! only values and inheritance sources move.

use crate::model::{PolicySchema, ResolvedPolicyValue, DEFAULT_INHERITED_OU};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub policies: Vec<PolicySchema>,
    /// Resolved schema names with no catalog entry. They are dropped.
    pub unmatched: Vec<String>,
}

pub fn merge(catalog: &[PolicySchema], resolved: &[ResolvedPolicyValue]) -> MergeReport {
    let mut policies: Vec<PolicySchema> = catalog
        .iter()
        .cloned()
        .map(|mut schema| {
            schema.inherited_ou = DEFAULT_INHERITED_OU.to_string();
            schema
        })
        .collect();

    let index: HashMap<String, usize> = policies
        .iter()
        .enumerate()
        .map(|(i, schema)| (schema.schema_name.clone(), i))
        .collect();

    let mut unmatched = Vec::new();

    for value in resolved {
        let Some(&i) = index.get(&value.schema_name) else {
            debug!(schema = %value.schema_name, "resolved value has no catalog schema, dropped");
            unmatched.push(value.schema_name.clone());
            continue;
        };

        let schema = &mut policies[i];
        schema.inherited_ou = value.source_ou.clone();
        for field in schema.fields.iter_mut() {
            if let Some(v) = value.values.get(&field.name) {
                field.value = v.clone();
            }
        }
    }

    MergeReport {
        policies,
        unmatched,
    }
}
