//! In-memory collaborators
//!
//! Process-local implementations of every port, used by the CLI and by tests.
//! [`InMemoryEntityStore`] applies the same project-name rules as the production
//! store.

use crate::ports::{AnalyticsSink, CollaboratorError, EntityStore, HistoryService, UserDirectory};
use crate::types::{
    DocumentId, FileId, FileSource, FolderId, HistoryId, Project, ProjectId, ProjectRecord,
    ProvisioningState, UserField, UserId, UserProfile,
};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Maximum project name length in characters
pub const MAX_PROJECT_NAME_LENGTH: usize = 150;

/// Document stored under a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredDocument {
    /// Document ID
    pub id: DocumentId,
    /// Parent folder
    pub folder_id: FolderId,
    /// File name
    pub name: String,
    /// Content lines
    pub lines: Vec<String>,
}

/// Binary file stored under a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// File ID
    pub id: FileId,
    /// Parent folder
    pub folder_id: FolderId,
    /// File name
    pub name: String,
    /// Content
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Content length in bytes
    pub size: usize,
}

/// Project with its attached entities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredProject {
    /// Project record
    pub project: Project,
    /// Documents in attach order
    pub documents: Vec<StoredDocument>,
    /// Files in attach order
    pub files: Vec<StoredFile>,
}

impl StoredProject {
    fn name_taken(&self, folder_id: FolderId, name: &str) -> bool {
        self.documents
            .iter()
            .any(|d| d.folder_id == folder_id && d.name == name)
            || self
                .files
                .iter()
                .any(|f| f.folder_id == folder_id && f.name == name)
    }
}

/// Entity store backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    projects: DashMap<ProjectId, StoredProject>,
}

impl InMemoryEntityStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Project record by ID
    #[must_use]
    pub fn project(&self, project_id: ProjectId) -> Option<Project> {
        self.projects.get(&project_id).map(|p| p.project.clone())
    }

    /// Project with its entities
    #[must_use]
    pub fn snapshot(&self, project_id: ProjectId) -> Option<StoredProject> {
        self.projects.get(&project_id).map(|p| p.clone())
    }

    /// Lines of a stored document
    #[must_use]
    pub fn document_lines(&self, project_id: ProjectId, document_id: DocumentId) -> Option<Vec<String>> {
        let project = self.projects.get(&project_id)?;
        project
            .documents
            .iter()
            .find(|d| d.id == document_id)
            .map(|d| d.lines.clone())
    }

    /// Number of persisted projects
    #[inline]
    #[must_use]
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// Projects whose provisioning never completed
    #[must_use]
    pub fn incomplete_projects(&self) -> Vec<Project> {
        self.projects
            .iter()
            .filter(|p| p.project.provisioning_state != ProvisioningState::Complete)
            .map(|p| p.project.clone())
            .collect()
    }

    fn check_parent(stored: &StoredProject, folder_id: FolderId, name: &str) -> Result<(), CollaboratorError> {
        if stored.project.root_folder.id != folder_id {
            return Err(CollaboratorError::NotFound(format!("folder {folder_id}")));
        }
        if stored.name_taken(folder_id, name) {
            return Err(CollaboratorError::Conflict(format!("file already exists: {name}")));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn validate_name(&self, name: &str) -> Result<(), CollaboratorError> {
        if name.trim().is_empty() {
            return Err(CollaboratorError::InvalidName("Project name cannot be blank".to_string()));
        }
        if name.chars().count() > MAX_PROJECT_NAME_LENGTH {
            return Err(CollaboratorError::InvalidName("Project name is too long".to_string()));
        }
        if name.contains('/') {
            return Err(CollaboratorError::InvalidName(
                "Project name cannot contain / characters".to_string(),
            ));
        }
        if name.contains('\\') {
            return Err(CollaboratorError::InvalidName(
                "Project name cannot contain \\ characters".to_string(),
            ));
        }
        Ok(())
    }

    async fn insert_project(&self, record: ProjectRecord) -> Result<Project, CollaboratorError> {
        let project = record.persisted(ProjectId::new());
        self.projects.insert(
            project.id,
            StoredProject {
                project: project.clone(),
                documents: Vec::new(),
                files: Vec::new(),
            },
        );
        Ok(project)
    }

    async fn attach_document(
        &self,
        project_id: ProjectId,
        folder_id: FolderId,
        file_name: &str,
        lines: &[String],
        acting_user: &UserId,
    ) -> Result<DocumentId, CollaboratorError> {
        let mut stored = self
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| CollaboratorError::NotFound(format!("project {project_id}")))?;
        Self::check_parent(&stored, folder_id, file_name)?;

        let id = DocumentId::new();
        stored.documents.push(StoredDocument {
            id,
            folder_id,
            name: file_name.to_string(),
            lines: lines.to_vec(),
        });
        stored.project.last_updated_by = acting_user.clone();
        Ok(id)
    }

    async fn attach_file(
        &self,
        project_id: ProjectId,
        folder_id: FolderId,
        file_name: &str,
        source: FileSource,
        acting_user: &UserId,
    ) -> Result<FileId, CollaboratorError> {
        // read before taking the map guard
        let bytes = match source {
            FileSource::Bytes(bytes) => bytes,
            FileSource::Path(path) => tokio::fs::read(&path).await?,
        };

        let mut stored = self
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| CollaboratorError::NotFound(format!("project {project_id}")))?;
        Self::check_parent(&stored, folder_id, file_name)?;

        let id = FileId::new();
        stored.files.push(StoredFile {
            id,
            folder_id,
            name: file_name.to_string(),
            size: bytes.len(),
            bytes,
        });
        stored.project.last_updated_by = acting_user.clone();
        Ok(id)
    }

    async fn set_root_document(
        &self,
        project_id: ProjectId,
        document_id: DocumentId,
    ) -> Result<(), CollaboratorError> {
        let mut stored = self
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| CollaboratorError::NotFound(format!("project {project_id}")))?;
        if !stored.documents.iter().any(|d| d.id == document_id) {
            return Err(CollaboratorError::NotFound(format!("document {document_id}")));
        }
        stored.project.root_doc_id = Some(document_id);
        Ok(())
    }

    async fn set_provisioning_state(
        &self,
        project_id: ProjectId,
        state: ProvisioningState,
    ) -> Result<(), CollaboratorError> {
        let mut stored = self
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| CollaboratorError::NotFound(format!("project {project_id}")))?;
        stored.project.provisioning_state = state;
        Ok(())
    }
}

/// User directory backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, UserProfile>,
}

impl InMemoryUserDirectory {
    /// Create empty directory
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile
    pub fn insert(&self, profile: UserProfile) {
        self.users.insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(
        &self,
        user_id: &UserId,
        fields: &[UserField],
    ) -> Result<Option<UserProfile>, CollaboratorError> {
        Ok(self.users.get(user_id).map(|p| p.project(fields)))
    }
}

/// History service handing out sequential ids
#[derive(Debug)]
pub struct InMemoryHistoryService {
    enabled: bool,
    next_id: AtomicU64,
    issued: AtomicU64,
}

impl InMemoryHistoryService {
    /// Create service issuing ids from 1
    #[inline]
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            next_id: AtomicU64::new(1),
            issued: AtomicU64::new(0),
        }
    }

    /// Create service that declines every request
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::enabled()
        }
    }

    /// Number of ids issued so far
    #[inline]
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryService for InMemoryHistoryService {
    async fn initialize_history(&self) -> Result<Option<HistoryId>, CollaboratorError> {
        if !self.enabled {
            return Ok(None);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(Some(HistoryId(id.to_string())))
    }
}

/// Event captured by [`RecordingAnalytics`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedEvent {
    /// Acting user
    pub user_id: UserId,
    /// Event name
    pub event: String,
    /// Event payload
    pub payload: serde_json::Value,
}

/// Analytics sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<RecordedEvent>>,
    failing: AtomicBool,
}

impl RecordingAnalytics {
    /// Create empty sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `record_event` fail without recording
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Events recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl AnalyticsSink for RecordingAnalytics {
    async fn record_event(
        &self,
        user_id: &UserId,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("analytics".to_string()));
        }
        self.events.lock().push(RecordedEvent {
            user_id: user_id.clone(),
            event: event.to_string(),
            payload,
        });
        Ok(())
    }
}
