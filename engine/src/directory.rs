//! Org unit directory: the flat OU list plus the lookups the console needs
//! to label where a policy value comes from.

use crate::api::wire::OrgUnitRecord;
use crate::api::PolicyBackend;
use crate::error::PolicyError;
use crate::model::{ou_id_suffix, OrgUnit, DEFAULT_INHERITED_OU, ROOT_PATH};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrgDirectory {
    units: Vec<OrgUnit>,
}

impl OrgDirectory {
    #[instrument(skip(backend))]
    pub async fn fetch(backend: &dyn PolicyBackend) -> Result<Self, PolicyError> {
        let records = backend.list_org_units().await?;
        let directory = Self::from_units(records.into_iter().map(org_unit_from_record).collect());
        debug!(units = directory.units.len(), "org units loaded");
        Ok(directory)
    }

    /// Build a directory, adding a synthetic `/` entry when the listing only
    /// names the root as a parent.
    pub fn from_units(mut units: Vec<OrgUnit>) -> Self {
        if !units.iter().any(OrgUnit::is_root) {
            let root_id = units
                .iter()
                .find(|u| u.path.matches('/').count() == 1)
                .and_then(|u| u.parent_id.clone());
            if let Some(id) = root_id {
                units.insert(
                    0,
                    OrgUnit {
                        id,
                        path: ROOT_PATH.to_string(),
                        parent_id: None,
                    },
                );
            }
        }
        Self { units }
    }

    pub fn units(&self) -> &[OrgUnit] {
        &self.units
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn root(&self) -> Option<&OrgUnit> {
        self.units.iter().find(|u| u.is_root())
    }

    /// Look up by full id (`id:abc`) or by the opaque suffix alone.
    pub fn find(&self, ou_id: &str) -> Option<&OrgUnit> {
        let suffix = ou_id_suffix(ou_id);
        self.units.iter().find(|u| u.id_suffix() == suffix)
    }

    pub fn find_by_path(&self, path: &str) -> Option<&OrgUnit> {
        self.units.iter().find(|u| u.path == path)
    }

    /// Accept either an OU path (`/Sales/EMEA`) or an id.
    pub fn select(&self, selector: &str) -> Option<&OrgUnit> {
        if selector.starts_with('/') {
            self.find_by_path(selector)
        } else {
            self.find(selector)
        }
    }

    pub fn children_of(&self, ou_id: &str) -> Vec<&OrgUnit> {
        let suffix = ou_id_suffix(ou_id);
        self.units
            .iter()
            .filter(|u| {
                u.parent_id
                    .as_deref()
                    .is_some_and(|p| ou_id_suffix(p) == suffix)
            })
            .collect()
    }

    /// Path of the OU with this id; unknown ids map to the root path.
    pub fn path_for_id(&self, ou_id: &str) -> &str {
        self.find(ou_id).map(|u| u.path.as_str()).unwrap_or(ROOT_PATH)
    }

    /// Human label for a schema's `inherited_ou`: `default`, `root`, or the OU path.
    pub fn inheritance_label(&self, inherited_ou: &str) -> String {
        if inherited_ou == DEFAULT_INHERITED_OU {
            return DEFAULT_INHERITED_OU.to_string();
        }
        match self.path_for_id(inherited_ou) {
            ROOT_PATH => "root".to_string(),
            path => path.to_string(),
        }
    }

    /// Whether a value shown for `selected_ou` is inherited rather than set on it.
    pub fn is_inherited(&self, inherited_ou: &str, selected_ou: &str) -> bool {
        inherited_ou == DEFAULT_INHERITED_OU
            || self.path_for_id(selected_ou) == ROOT_PATH
            || ou_id_suffix(inherited_ou) != ou_id_suffix(selected_ou)
    }
}

fn org_unit_from_record(record: OrgUnitRecord) -> OrgUnit {
    OrgUnit {
        id: record.org_unit_id,
        path: record.org_unit_path,
        parent_id: record.parent_org_unit_id,
    }
}
