//! Pending changes for the selected org unit.
//!
//! Field edits and inherit requests are kept apart; building a submission
//! turns them into the two write batches, with inherit taking precedence
//! when both name the same schema.

use crate::error::EditError;
use crate::model::{InheritRequest, ModifyRequest, PolicySchema, PolicyTargetKey, PolicyValue};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Interpret raw form input: the lowercased text as a JSON literal if it is
/// one, otherwise the original text as a string.
pub fn coerce_value(raw: &str) -> Value {
    serde_json::from_str(&raw.to_lowercase()).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub to_modify: Vec<ModifyRequest>,
    pub to_inherit: Vec<InheritRequest>,
}

impl Submission {
    pub fn is_empty(&self) -> bool {
        self.to_modify.is_empty() && self.to_inherit.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SchemaEdits {
    schema: String,
    fields: Vec<(String, Value)>,
}

#[derive(Debug, Clone, Default)]
pub struct EditTracker {
    /// Schema → field names, when edits are checked against a displayed policy list.
    known: Option<HashMap<String, HashSet<String>>>,
    edits: Vec<SchemaEdits>,
    inherits: Vec<String>,
}

impl EditTracker {
    /// Tracker that accepts any schema and field name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that rejects edits naming schemas or fields not in `policies`.
    pub fn for_policies(policies: &[PolicySchema]) -> Self {
        let mut tracker = Self::default();
        tracker.set_policies(policies);
        tracker
    }

    /// Replace the list edits are checked against. Pending edits are kept.
    pub fn set_policies(&mut self, policies: &[PolicySchema]) {
        let known = policies
            .iter()
            .map(|p| {
                (
                    p.schema_name.clone(),
                    p.fields.iter().map(|f| f.name.clone()).collect(),
                )
            })
            .collect();
        self.known = Some(known);
    }

    fn check_known(&self, schema: &str, field: Option<&str>) -> Result<(), EditError> {
        let Some(known) = &self.known else {
            return Ok(());
        };
        let fields = known.get(schema).ok_or_else(|| EditError::UnknownSchema {
            schema: schema.to_string(),
        })?;
        match field {
            Some(field) if !fields.contains(field) => Err(EditError::UnknownField {
                schema: schema.to_string(),
                field: field.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Record a field edit. Empty input is ignored; a repeated edit of the
    /// same field replaces the earlier value in place.
    pub fn record_edit(&mut self, schema: &str, field: &str, raw: &str) -> Result<(), EditError> {
        self.check_known(schema, Some(field))?;
        if self.is_locked(schema) {
            return Err(EditError::SchemaLocked {
                schema: schema.to_string(),
            });
        }
        if raw.is_empty() {
            debug!(schema, field, "empty input ignored");
            return Ok(());
        }

        let value = coerce_value(raw);
        let entry = match self.edits.iter_mut().position(|e| e.schema == schema) {
            Some(i) => &mut self.edits[i],
            None => {
                self.edits.push(SchemaEdits {
                    schema: schema.to_string(),
                    fields: Vec::new(),
                });
                let last = self.edits.len() - 1;
                &mut self.edits[last]
            }
        };

        match entry.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = value,
            None => entry.fields.push((field.to_string(), value)),
        }
        Ok(())
    }

    /// Mark a schema to inherit from its parent. Further edits to it are rejected.
    pub fn record_inherit(&mut self, schema: &str) -> Result<(), EditError> {
        self.check_known(schema, None)?;
        if !self.is_locked(schema) {
            self.inherits.push(schema.to_string());
        }
        Ok(())
    }

    pub fn is_locked(&self, schema: &str) -> bool {
        self.inherits.iter().any(|s| s == schema)
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.inherits.is_empty()
    }

    pub fn dirty_schemas(&self) -> impl Iterator<Item = &str> {
        self.edits.iter().map(|e| e.schema.as_str())
    }

    pub fn inherit_schemas(&self) -> impl Iterator<Item = &str> {
        self.inherits.iter().map(String::as_str)
    }

    /// Build the modify and inherit batches for `target_ou`.
    pub fn build_submission(&self, target_ou: &str) -> Submission {
        let to_inherit: Vec<InheritRequest> = self
            .inherits
            .iter()
            .map(|schema| InheritRequest {
                policy_target_key: PolicyTargetKey::for_org_unit(target_ou),
                policy_schema: schema.clone(),
            })
            .collect();

        let to_modify = self
            .edits
            .iter()
            .filter(|e| !self.is_locked(&e.schema))
            .map(|e| {
                let update_mask = e
                    .fields
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                let value: Map<String, Value> = e.fields.iter().cloned().collect();
                ModifyRequest {
                    policy_target_key: PolicyTargetKey::for_org_unit(target_ou),
                    policy_value: PolicyValue {
                        policy_schema: e.schema.clone(),
                        value,
                    },
                    update_mask,
                }
            })
            .collect();

        Submission {
            to_modify,
            to_inherit,
        }
    }

    /// Forget field edits after a successful modify batch.
    pub fn clear_modified(&mut self) {
        self.edits.clear();
    }

    /// Forget inherit requests after a successful inherit batch.
    pub fn clear_inherited(&mut self) {
        self.inherits.clear();
    }

    /// Drop everything, e.g. when the selected scope changes.
    pub fn discard(&mut self) {
        self.edits.clear();
        self.inherits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDescription, DEFAULT_INHERITED_OU};
    use serde_json::json;

    const PRINTERS: &str = "chrome.users.appsconfig.PrintersSettings";
    const WALLPAPER: &str = "chrome.users.appsconfig.Wallpaper";

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value("true"), json!(true));
        assert_eq!(coerce_value("FALSE"), json!(false));
        assert_eq!(coerce_value("42"), json!(42));
        assert_eq!(coerce_value("hello"), json!("hello"));
        assert_eq!(coerce_value("Hello World"), json!("Hello World"));
        assert_eq!(coerce_value("null"), Value::Null);
    }

    #[test]
    fn test_build_submission_carries_only_touched_fields() {
        let mut tracker = EditTracker::new();
        tracker.record_edit(PRINTERS, "allowPrinting", "true").unwrap();
        tracker.record_edit(PRINTERS, "maxCopies", "5").unwrap();
        tracker.record_edit(PRINTERS, "allowPrinting", "false").unwrap();

        let submission = tracker.build_submission("id:123");
        assert!(submission.to_inherit.is_empty());
        assert_eq!(submission.to_modify.len(), 1);

        let request = &submission.to_modify[0];
        assert_eq!(request.schema_name(), PRINTERS);
        assert_eq!(request.update_mask, "allowPrinting,maxCopies");
        assert_eq!(request.policy_target_key.target_resource, "orgunits/123");
        assert_eq!(
            json!(request.policy_value.value),
            json!({ "allowPrinting": false, "maxCopies": 5 })
        );
    }

    #[test]
    fn test_inherit_wins_over_modify() {
        let mut tracker = EditTracker::new();
        tracker.record_edit(PRINTERS, "allowPrinting", "true").unwrap();
        tracker.record_edit(WALLPAPER, "url", "https://example.com/a.png").unwrap();
        tracker.record_inherit(PRINTERS).unwrap();

        let submission = tracker.build_submission("id:123");
        let modified: Vec<_> = submission.to_modify.iter().map(|r| r.schema_name()).collect();
        assert_eq!(modified, vec![WALLPAPER]);
        assert_eq!(submission.to_inherit.len(), 1);
        assert_eq!(submission.to_inherit[0].policy_schema, PRINTERS);
    }

    #[test]
    fn test_inherited_schema_is_locked() {
        let mut tracker = EditTracker::new();
        tracker.record_inherit(PRINTERS).unwrap();
        tracker.record_inherit(PRINTERS).unwrap();

        assert_eq!(
            tracker.record_edit(PRINTERS, "allowPrinting", "true"),
            Err(EditError::SchemaLocked {
                schema: PRINTERS.to_string()
            })
        );
        assert_eq!(tracker.build_submission("id:1").to_inherit.len(), 1);
    }

    #[test]
    fn test_empty_input_is_ignored() {
        let mut tracker = EditTracker::new();
        tracker.record_edit(PRINTERS, "allowPrinting", "").unwrap();
        assert!(tracker.is_empty());
        assert!(tracker.build_submission("id:1").is_empty());
    }

    #[test]
    fn test_known_policies_validate_names() {
        let policies = vec![PolicySchema {
            schema_name: PRINTERS.to_string(),
            category_title: String::new(),
            description: String::new(),
            lifecycle_stage: String::new(),
            target_keys: None,
            fields: vec![FieldDescription {
                name: "allowPrinting".to_string(),
                description: String::new(),
                field_type: "TYPE_BOOL".to_string(),
                required: false,
                value: json!(false),
                known_values: vec![],
            }],
            inherited_ou: DEFAULT_INHERITED_OU.to_string(),
        }];

        let mut tracker = EditTracker::for_policies(&policies);
        assert!(tracker.record_edit(PRINTERS, "allowPrinting", "true").is_ok());
        assert!(matches!(
            tracker.record_edit(PRINTERS, "colour", "red"),
            Err(EditError::UnknownField { .. })
        ));
        assert!(matches!(
            tracker.record_inherit(WALLPAPER),
            Err(EditError::UnknownSchema { .. })
        ));
    }

    #[test]
    fn test_clear_batches_independently() {
        let mut tracker = EditTracker::new();
        tracker.record_edit(WALLPAPER, "url", "x").unwrap();
        tracker.record_inherit(PRINTERS).unwrap();

        tracker.clear_inherited();
        assert_eq!(tracker.dirty_schemas().collect::<Vec<_>>(), vec![WALLPAPER]);
        assert_eq!(tracker.inherit_schemas().count(), 0);

        tracker.record_inherit(PRINTERS).unwrap();
        tracker.clear_modified();
        assert_eq!(tracker.dirty_schemas().count(), 0);
        assert_eq!(tracker.inherit_schemas().collect::<Vec<_>>(), vec![PRINTERS]);

        tracker.discard();
        assert!(tracker.is_empty());
    }
}
