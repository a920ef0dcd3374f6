//! Testing utilities for texproj workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use texproj_core::memory::{
    InMemoryEntityStore, InMemoryHistoryService, InMemoryUserDirectory, RecordingAnalytics,
};
use texproj_core::{
    CollaboratorError, Collaborators, DocumentId, EntityStore, FileId, FileSource, FolderId,
    Project, ProjectId, ProjectProvisioner, ProjectRecord, ProvisioningConfig, ProvisioningState,
    UserId, UserProfile,
};
use texproj_template::{TemplateDescriptor, TemplateRegistry, TemplateRenderer};

pub const OWNER: &str = "owner-1";

pub fn owner() -> UserId {
    UserId::new(OWNER)
}

pub fn owner_profile() -> UserProfile {
    UserProfile::new(owner())
        .with_names("Ada", "Lovelace")
        .with_spell_check_language("en_GB")
}

/// Store operation as seen by [`ScriptedStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ValidateName(String),
    InsertProject(String),
    AttachDocument(String),
    AttachFile(String),
    SetRootDocument,
    SetProvisioningState(ProvisioningState),
}

impl StoreCall {
    pub fn is_attach(&self) -> bool {
        matches!(self, Self::AttachDocument(_) | Self::AttachFile(_))
    }
}

type FailPredicate = Box<dyn Fn(&StoreCall) -> bool + Send + Sync>;

/// In-memory store that logs every call and can fail chosen ones
pub struct ScriptedStore {
    inner: InMemoryEntityStore,
    calls: Mutex<Vec<StoreCall>>,
    fail_on: Mutex<Option<FailPredicate>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryEntityStore::new(),
            calls: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
        }
    }

    /// Fail every call matching `predicate` with `Unavailable`
    pub fn fail_on(&self, predicate: impl Fn(&StoreCall) -> bool + Send + Sync + 'static) {
        *self.fail_on.lock() = Some(Box::new(predicate));
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn inner(&self) -> &InMemoryEntityStore {
        &self.inner
    }

    fn enter(&self, call: StoreCall) -> Result<(), CollaboratorError> {
        let fail = self
            .fail_on
            .lock()
            .as_ref()
            .is_some_and(|predicate| predicate(&call));
        let label = format!("{call:?}");
        self.calls.lock().push(call);
        if fail {
            return Err(CollaboratorError::Unavailable(format!("scripted failure on {label}")));
        }
        Ok(())
    }
}

impl Default for ScriptedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for ScriptedStore {
    async fn validate_name(&self, name: &str) -> Result<(), CollaboratorError> {
        self.enter(StoreCall::ValidateName(name.to_string()))?;
        self.inner.validate_name(name).await
    }

    async fn insert_project(&self, record: ProjectRecord) -> Result<Project, CollaboratorError> {
        self.enter(StoreCall::InsertProject(record.name.clone()))?;
        self.inner.insert_project(record).await
    }

    async fn attach_document(
        &self,
        project_id: ProjectId,
        folder_id: FolderId,
        file_name: &str,
        lines: &[String],
        acting_user: &UserId,
    ) -> Result<DocumentId, CollaboratorError> {
        self.enter(StoreCall::AttachDocument(file_name.to_string()))?;
        self.inner
            .attach_document(project_id, folder_id, file_name, lines, acting_user)
            .await
    }

    async fn attach_file(
        &self,
        project_id: ProjectId,
        folder_id: FolderId,
        file_name: &str,
        source: FileSource,
        acting_user: &UserId,
    ) -> Result<FileId, CollaboratorError> {
        self.enter(StoreCall::AttachFile(file_name.to_string()))?;
        self.inner
            .attach_file(project_id, folder_id, file_name, source, acting_user)
            .await
    }

    async fn set_root_document(
        &self,
        project_id: ProjectId,
        document_id: DocumentId,
    ) -> Result<(), CollaboratorError> {
        self.enter(StoreCall::SetRootDocument)?;
        self.inner.set_root_document(project_id, document_id).await
    }

    async fn set_provisioning_state(
        &self,
        project_id: ProjectId,
        state: ProvisioningState,
    ) -> Result<(), CollaboratorError> {
        self.enter(StoreCall::SetProvisioningState(state))?;
        self.inner.set_provisioning_state(project_id, state).await
    }
}

/// Provisioner wired to in-memory collaborators, with handles to each
pub struct TestHarness {
    pub provisioner: ProjectProvisioner,
    pub store: Arc<ScriptedStore>,
    pub history: Arc<InMemoryHistoryService>,
    pub users: Arc<InMemoryUserDirectory>,
    pub analytics: Arc<RecordingAnalytics>,
}

impl TestHarness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub fn project(&self, project_id: ProjectId) -> Option<Project> {
        self.store.inner().project(project_id)
    }

    pub fn root_doc_lines(&self, project: &Project) -> Option<Vec<String>> {
        let root_doc = project.root_doc_id?;
        self.store.inner().document_lines(project.id, root_doc)
    }
}

pub struct HarnessBuilder {
    config: ProvisioningConfig,
    history_enabled: bool,
    templates: Option<(TemplateRegistry, TemplateRenderer)>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            config: ProvisioningConfig::new(),
            history_enabled: true,
            templates: None,
        }
    }
}

impl HarnessBuilder {
    pub fn config(mut self, config: ProvisioningConfig) -> Self {
        self.config = config;
        self
    }

    pub fn history_disabled(mut self) -> Self {
        self.history_enabled = false;
        self
    }

    /// Serve templates from `root` with the given custom descriptors
    pub fn templates<I, K>(mut self, root: &Path, custom: I) -> Self
    where
        I: IntoIterator<Item = (K, TemplateDescriptor)>,
        K: Into<String>,
    {
        self.templates = Some((TemplateRegistry::new(custom), TemplateRenderer::new(root)));
        self
    }

    pub fn build(self) -> TestHarness {
        let store = Arc::new(ScriptedStore::new());
        let history = Arc::new(if self.history_enabled {
            InMemoryHistoryService::enabled()
        } else {
            InMemoryHistoryService::disabled()
        });
        let users = Arc::new(InMemoryUserDirectory::new());
        users.insert(owner_profile());
        let analytics = Arc::new(RecordingAnalytics::new());

        let collaborators = Collaborators {
            store: store.clone(),
            history: history.clone(),
            users: users.clone(),
            analytics: analytics.clone(),
        };
        let mut provisioner = ProjectProvisioner::new(collaborators, &self.config);
        if let Some((registry, renderer)) = self.templates {
            provisioner = provisioner.with_templates(registry, renderer);
        }

        TestHarness {
            provisioner,
            store,
            history,
            users,
            analytics,
        }
    }
}

pub fn setup_test_harness() -> TestHarness {
    TestHarness::builder().build()
}

/// Write `files` below a fresh temporary directory
pub fn template_tree(files: &[(&str, &[u8])]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, contents) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, contents).unwrap();
    }
    dir
}

pub fn lines(text: &str) -> Vec<String> {
    texproj_template::split_lines(text)
}
