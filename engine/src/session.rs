//! Console state for one administrator: the selected scope, what is shown
//! for it, and the edits pending against it.

use crate::api::PolicyBackend;
use crate::catalog::fetch_catalog;
use crate::categories;
use crate::directory::OrgDirectory;
use crate::edits::{EditTracker, Submission};
use crate::error::{EditError, PolicyError, SessionError};
use crate::merge::merge;
use crate::model::{OrgUnit, PolicySchema, ResolvedPolicyValue};
use crate::resolver::resolve_policies;
use crate::submit::{submit, SubmissionReport};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loaded,
    Failed(PolicyError),
}

impl LoadState {
    pub fn error(&self) -> Option<&PolicyError> {
        match self {
            LoadState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Identifies one resolve request. Only the most recently issued ticket may
/// update the displayed policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveTicket {
    generation: u64,
    ou_id: String,
    namespace: String,
}

impl ResolveTicket {
    pub fn ou_id(&self) -> &str {
        &self.ou_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

pub struct ConsoleSession {
    backend: Arc<dyn PolicyBackend>,
    directory: OrgDirectory,
    selected_ou: OrgUnit,
    category: &'static str,
    namespace: &'static str,
    catalog: Vec<PolicySchema>,
    policies: Vec<PolicySchema>,
    unmatched: Vec<String>,
    tracker: EditTracker,
    generation: u64,
    catalog_state: LoadState,
    resolve_state: LoadState,
}

impl ConsoleSession {
    /// Load the org unit directory and show `category` for the root OU.
    pub async fn open(
        backend: Arc<dyn PolicyBackend>,
        category: &str,
    ) -> Result<Self, SessionError> {
        Self::open_at(backend, "/", category).await
    }

    /// Load the org unit directory and show `category` for the OU named by
    /// `ou_selector` (path or id). The catalog and the OU are each fetched once.
    pub async fn open_at(
        backend: Arc<dyn PolicyBackend>,
        ou_selector: &str,
        category: &str,
    ) -> Result<Self, SessionError> {
        let (category, namespace) = lookup_category(category)?;
        let directory = OrgDirectory::fetch(backend.as_ref())
            .await
            .map_err(SessionError::Directory)?;
        let selected_ou = directory
            .select(ou_selector)
            .cloned()
            .ok_or_else(|| SessionError::UnknownOrgUnit {
                selector: ou_selector.to_string(),
            })?;

        let mut session = Self {
            backend,
            directory,
            selected_ou,
            category,
            namespace,
            catalog: Vec::new(),
            policies: Vec::new(),
            unmatched: Vec::new(),
            tracker: EditTracker::new(),
            generation: 0,
            catalog_state: LoadState::Idle,
            resolve_state: LoadState::Idle,
        };
        session.load_catalog().await;
        session.refresh().await;
        Ok(session)
    }

    pub fn directory(&self) -> &OrgDirectory {
        &self.directory
    }

    pub fn selected_ou(&self) -> &OrgUnit {
        &self.selected_ou
    }

    pub fn category(&self) -> &str {
        self.category
    }

    pub fn namespace(&self) -> &str {
        self.namespace
    }

    pub fn policies(&self) -> &[PolicySchema] {
        &self.policies
    }

    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    pub fn catalog_state(&self) -> &LoadState {
        &self.catalog_state
    }

    pub fn resolve_state(&self) -> &LoadState {
        &self.resolve_state
    }

    pub fn tracker(&self) -> &EditTracker {
        &self.tracker
    }

    /// Switch OU and/or category. Pending edits are discarded and the view is
    /// reloaded. Returns false when the scope did not change.
    pub async fn select_scope(
        &mut self,
        ou_selector: &str,
        category: &str,
    ) -> Result<bool, SessionError> {
        let (category, namespace) = lookup_category(category)?;
        let ou = self
            .directory
            .select(ou_selector)
            .cloned()
            .ok_or_else(|| SessionError::UnknownOrgUnit {
                selector: ou_selector.to_string(),
            })?;

        let ou_changed = ou.id != self.selected_ou.id;
        let category_changed = namespace != self.namespace;
        if !ou_changed && !category_changed {
            return Ok(false);
        }

        info!(ou = %ou.path, category, "scope changed");
        self.tracker.discard();
        self.selected_ou = ou;
        self.category = category;
        self.namespace = namespace;

        if category_changed {
            self.load_catalog().await;
        }
        self.refresh().await;
        Ok(true)
    }

    /// Refetch the catalog for the current namespace. On failure the catalog
    /// is empty and `catalog_state` carries the error.
    pub async fn load_catalog(&mut self) {
        match fetch_catalog(self.backend.as_ref(), self.namespace).await {
            Ok(catalog) => {
                self.catalog = catalog;
                self.catalog_state = LoadState::Loaded;
            }
            Err(e) => {
                warn!(namespace = self.namespace, "catalog fetch failed: {}", e);
                self.catalog.clear();
                self.catalog_state = LoadState::Failed(e);
            }
        }
        self.remerge(&[]);
    }

    /// Issue a ticket for a resolve of the current scope, superseding any
    /// earlier ticket.
    pub fn begin_resolve(&mut self) -> ResolveTicket {
        self.generation += 1;
        ResolveTicket {
            generation: self.generation,
            ou_id: self.selected_ou.id.clone(),
            namespace: self.namespace.to_string(),
        }
    }

    /// Apply a resolve result. Results for a superseded ticket are discarded
    /// and `false` is returned.
    pub fn apply_resolved(
        &mut self,
        ticket: ResolveTicket,
        result: Result<Vec<ResolvedPolicyValue>, PolicyError>,
    ) -> bool {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                latest = self.generation,
                "stale resolve response discarded"
            );
            return false;
        }

        match result {
            Ok(resolved) => {
                self.resolve_state = LoadState::Loaded;
                self.remerge(&resolved);
            }
            Err(e) => {
                warn!(ou = %ticket.ou_id, "resolve failed: {}", e);
                self.resolve_state = LoadState::Failed(e);
                self.remerge(&[]);
            }
        }
        true
    }

    /// Resolve the current scope and update the displayed policies.
    pub async fn refresh(&mut self) {
        let ticket = self.begin_resolve();
        let result = resolve_policies(self.backend.as_ref(), &ticket.ou_id, &ticket.namespace).await;
        self.apply_resolved(ticket, result);
    }

    fn remerge(&mut self, resolved: &[ResolvedPolicyValue]) {
        let report = merge(&self.catalog, resolved);
        self.policies = report.policies;
        self.unmatched = report.unmatched;
        self.tracker.set_policies(&self.policies);
    }

    pub fn record_edit(&mut self, schema: &str, field: &str, raw: &str) -> Result<(), EditError> {
        self.tracker.record_edit(schema, field, raw)
    }

    pub fn record_inherit(&mut self, schema: &str) -> Result<(), EditError> {
        self.tracker.record_inherit(schema)
    }

    pub fn pending_submission(&self) -> Submission {
        self.tracker.build_submission(&self.selected_ou.id)
    }

    /// Submit pending changes; on any applied batch, re-resolve so the view
    /// shows the server's values.
    pub async fn submit(&mut self) -> SubmissionReport {
        let submission = self.pending_submission();
        let report = submit(self.backend.as_ref(), &submission).await;
        report.reconcile(&mut self.tracker);
        if report.policies_changed() {
            self.refresh().await;
        }
        report
    }

    /// Label for where a schema's value comes from: `default`, `root` or an OU path.
    pub fn inheritance_label(&self, policy: &PolicySchema) -> String {
        self.directory.inheritance_label(&policy.inherited_ou)
    }

    pub fn is_inherited(&self, policy: &PolicySchema) -> bool {
        self.directory
            .is_inherited(&policy.inherited_ou, &self.selected_ou.id)
    }
}

fn lookup_category(category: &str) -> Result<(&'static str, &'static str), SessionError> {
    categories::canonical_name(category)
        .zip(categories::namespace_for(category))
        .ok_or_else(|| SessionError::UnknownCategory {
            category: category.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::wire::{OrgUnitRecord, ResolvedPolicyRecord, SchemaRecord};
    use crate::api::Page;
    use crate::model::{InheritRequest, ModifyRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const PRINTERS: &str = "chrome.users.appsconfig.PrintersSettings";

    /// Canned backend: schemas by namespace, resolved values by target resource.
    #[derive(Default)]
    struct FakeBackend {
        schemas: HashMap<String, Vec<serde_json::Value>>,
        resolved: Mutex<HashMap<String, Vec<serde_json::Value>>>,
        fail_schemas: bool,
        fail_resolve: bool,
        resolve_calls: Mutex<Vec<String>>,
        modify_calls: Mutex<usize>,
    }

    impl FakeBackend {
        fn printers() -> Self {
            let mut schemas = HashMap::new();
            schemas.insert(
                "chrome.users.appsconfig".to_string(),
                vec![json!({
                    "schemaName": PRINTERS,
                    "fieldDescriptions": [
                        { "field": "allowPrinting", "defaultValue": false },
                        { "field": "maxCopies", "defaultValue": 10 }
                    ]
                })],
            );
            schemas.insert(
                "chrome.users".to_string(),
                vec![json!({
                    "schemaName": "chrome.users.Wallpaper",
                    "fieldDescriptions": [{ "field": "url", "defaultValue": "" }]
                })],
            );
            Self {
                schemas,
                ..Self::default()
            }
        }

        fn set_resolved(&self, target: &str, records: Vec<serde_json::Value>) {
            self.resolved
                .lock()
                .unwrap()
                .insert(target.to_string(), records);
        }
    }

    #[async_trait]
    impl PolicyBackend for FakeBackend {
        async fn list_schemas(
            &self,
            namespace: &str,
            _page_token: Option<&str>,
        ) -> Result<Page<SchemaRecord>, PolicyError> {
            if self.fail_schemas {
                return Err(PolicyError::Transport {
                    status: Some(500),
                    message: "backend error".to_string(),
                });
            }
            let records = self
                .schemas
                .get(namespace)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|v| serde_json::from_value(v).unwrap())
                .collect();
            Ok(Page::last(records))
        }

        async fn resolve(
            &self,
            target_resource: &str,
            _schema_filter: &str,
            _page_token: Option<&str>,
        ) -> Result<Page<ResolvedPolicyRecord>, PolicyError> {
            self.resolve_calls
                .lock()
                .unwrap()
                .push(target_resource.to_string());
            if self.fail_resolve {
                return Err(PolicyError::Transport {
                    status: Some(500),
                    message: "resolve unavailable".to_string(),
                });
            }
            let records = self
                .resolved
                .lock()
                .unwrap()
                .get(target_resource)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|v| serde_json::from_value(v).unwrap())
                .collect();
            Ok(Page::last(records))
        }

        async fn list_org_units(&self) -> Result<Vec<OrgUnitRecord>, PolicyError> {
            Ok(vec![
                serde_json::from_value(json!({
                    "orgUnitId": "id:sales",
                    "orgUnitPath": "/Sales",
                    "parentOrgUnitId": "id:root"
                }))
                .unwrap(),
                serde_json::from_value(json!({
                    "orgUnitId": "id:emea",
                    "orgUnitPath": "/Sales/EMEA",
                    "parentOrgUnitId": "id:sales"
                }))
                .unwrap(),
            ])
        }

        async fn batch_modify(&self, _requests: &[ModifyRequest]) -> Result<(), PolicyError> {
            *self.modify_calls.lock().unwrap() += 1;
            Ok(())
        }

        async fn batch_inherit(&self, _requests: &[InheritRequest]) -> Result<(), PolicyError> {
            Ok(())
        }
    }

    fn printers_value(source: &str, allow: bool) -> serde_json::Value {
        json!({
            "value": { "policySchema": PRINTERS, "value": { "allowPrinting": allow } },
            "sourceKey": { "targetResource": format!("orgunits/{}", source) }
        })
    }

    #[tokio::test]
    async fn test_open_shows_root_with_defaults() {
        let backend = Arc::new(FakeBackend::printers());
        let session = ConsoleSession::open(backend.clone(), "user application settings")
            .await
            .unwrap();

        assert_eq!(session.category(), "User Application settings");
        assert_eq!(session.selected_ou().path, "/");
        assert_eq!(session.catalog_state(), &LoadState::Loaded);
        assert_eq!(session.resolve_state(), &LoadState::Loaded);
        assert_eq!(session.policies().len(), 1);
        assert!(session.policies()[0].is_default());
        assert_eq!(*backend.resolve_calls.lock().unwrap(), vec!["orgunits/root"]);
    }

    #[tokio::test]
    async fn test_select_scope_resolves_new_ou_and_discards_edits() {
        let backend = Arc::new(FakeBackend::printers());
        backend.set_resolved("orgunits/emea", vec![printers_value("sales", true)]);
        let mut session = ConsoleSession::open(backend.clone(), "User Application settings")
            .await
            .unwrap();

        session.record_edit(PRINTERS, "maxCopies", "3").unwrap();
        assert!(!session.tracker().is_empty());

        let changed = session
            .select_scope("/Sales/EMEA", "User Application settings")
            .await
            .unwrap();
        assert!(changed);
        assert!(session.tracker().is_empty());

        let printers = &session.policies()[0];
        assert_eq!(printers.field("allowPrinting").unwrap().value, json!(true));
        assert_eq!(session.inheritance_label(printers), "/Sales");
        assert!(session.is_inherited(printers));

        let unchanged = session
            .select_scope("id:emea", "User Application settings")
            .await
            .unwrap();
        assert!(!unchanged);
    }

    #[tokio::test]
    async fn test_category_change_reloads_catalog() {
        let backend = Arc::new(FakeBackend::printers());
        let mut session = ConsoleSession::open(backend, "User Application settings")
            .await
            .unwrap();

        session.select_scope("/", "Users").await.unwrap();
        assert_eq!(session.namespace(), "chrome.users");
        assert_eq!(session.policies()[0].schema_name, "chrome.users.Wallpaper");
    }

    #[tokio::test]
    async fn test_unknown_scope_rejected() {
        let backend = Arc::new(FakeBackend::printers());
        let mut session = ConsoleSession::open(backend, "Users").await.unwrap();

        assert!(matches!(
            session.select_scope("/Nowhere", "Users").await,
            Err(SessionError::UnknownOrgUnit { .. })
        ));
        assert!(matches!(
            session.select_scope("/", "Printers").await,
            Err(SessionError::UnknownCategory { .. })
        ));
    }

    #[tokio::test]
    async fn test_stale_resolve_is_discarded() {
        let backend = Arc::new(FakeBackend::printers());
        let mut session = ConsoleSession::open(backend, "User Application settings")
            .await
            .unwrap();

        let stale = session.begin_resolve();
        let latest = session.begin_resolve();

        let stale_values = vec![ResolvedPolicyValue {
            schema_name: PRINTERS.to_string(),
            source_ou: "sales".to_string(),
            values: serde_json::from_value(json!({ "allowPrinting": true })).unwrap(),
        }];
        assert!(!session.apply_resolved(stale, Ok(stale_values)));
        assert!(session.policies()[0].is_default());

        assert!(session.apply_resolved(latest, Ok(vec![])));
        assert!(session.policies()[0].is_default());
    }

    #[tokio::test]
    async fn test_catalog_failure_is_reported_not_fatal() {
        let backend = Arc::new(FakeBackend {
            fail_schemas: true,
            ..FakeBackend::printers()
        });
        let session = ConsoleSession::open(backend, "Users").await.unwrap();

        assert!(session.policies().is_empty());
        assert_eq!(
            session.catalog_state().error().map(|e| e.message()),
            Some("backend error")
        );
    }

    #[tokio::test]
    async fn test_open_at_resolves_only_the_selected_ou() {
        let backend = Arc::new(FakeBackend::printers());
        backend.set_resolved("orgunits/emea", vec![printers_value("sales", true)]);

        let session =
            ConsoleSession::open_at(backend.clone(), "/Sales/EMEA", "User Application settings")
                .await
                .unwrap();

        assert_eq!(session.selected_ou().id, "id:emea");
        assert_eq!(*backend.resolve_calls.lock().unwrap(), vec!["orgunits/emea"]);
        assert_eq!(
            session.policies()[0].field("allowPrinting").unwrap().value,
            json!(true)
        );

        assert!(matches!(
            ConsoleSession::open_at(backend, "/Nowhere", "Users").await,
            Err(SessionError::UnknownOrgUnit { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_failure_falls_back_to_defaults() {
        let backend = Arc::new(FakeBackend::printers());
        let mut session = ConsoleSession::open(backend.clone(), "User Application settings")
            .await
            .unwrap();

        let ticket = session.begin_resolve();
        let values = vec![ResolvedPolicyValue {
            schema_name: PRINTERS.to_string(),
            source_ou: "sales".to_string(),
            values: serde_json::from_value(json!({ "allowPrinting": true })).unwrap(),
        }];
        assert!(session.apply_resolved(ticket, Ok(values)));
        assert!(!session.policies()[0].is_default());

        let ticket = session.begin_resolve();
        let error = PolicyError::Transport {
            status: Some(500),
            message: "resolve unavailable".to_string(),
        };
        assert!(session.apply_resolved(ticket, Err(error.clone())));

        assert_eq!(session.resolve_state(), &LoadState::Failed(error));
        assert_eq!(session.catalog_state(), &LoadState::Loaded);
        assert_eq!(session.policies().len(), 1);
        assert!(session.policies()[0].is_default());
        assert_eq!(
            session.policies()[0].field("allowPrinting").unwrap().value,
            json!(false)
        );
    }

    #[tokio::test]
    async fn test_open_with_failing_resolve_still_shows_catalog() {
        let backend = Arc::new(FakeBackend {
            fail_resolve: true,
            ..FakeBackend::printers()
        });
        let session = ConsoleSession::open(backend, "User Application settings")
            .await
            .unwrap();

        assert_eq!(
            session.resolve_state().error().map(|e| e.message()),
            Some("resolve unavailable")
        );
        assert!(session.policies()[0].is_default());
    }

    #[tokio::test]
    async fn test_submit_refreshes_view() {
        let backend = Arc::new(FakeBackend::printers());
        let mut session = ConsoleSession::open(backend.clone(), "User Application settings")
            .await
            .unwrap();

        session.record_edit(PRINTERS, "allowPrinting", "true").unwrap();
        backend.set_resolved("orgunits/root", vec![printers_value("root", true)]);

        let report = session.submit().await;
        assert!(report.is_success());
        assert_eq!(*backend.modify_calls.lock().unwrap(), 1);
        assert!(session.tracker().is_empty());
        assert_eq!(
            session.policies()[0].field("allowPrinting").unwrap().value,
            json!(true)
        );
        assert_eq!(backend.resolve_calls.lock().unwrap().len(), 2);
    }
}
