//! Collaborator ports
//!
//! The provisioner owns none of the systems it coordinates. Each one is reached
//! through a trait here:
//! - [`EntityStore`]: persists projects and their entity tree
//! - [`HistoryService`]: allocates durable history ids
//! - [`UserDirectory`]: resolves owner profiles
//! - [`AnalyticsSink`]: receives completion events
//!
//! Timeouts and retries belong to the implementations; any `Err` is treated as a
//! failure of that step.

use crate::types::{
    DocumentId, FileId, FileSource, FolderId, HistoryId, Project, ProjectId, ProjectRecord,
    ProvisioningState, UserField, UserId, UserProfile,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Failure reported by a collaborator
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// Name rejected by the store's rules
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Entity already exists
    #[error("conflict: {0}")]
    Conflict(String),

    /// Collaborator unreachable or timed out
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Local I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Entity-tree store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Check a project name against the store's length and charset rules
    async fn validate_name(&self, name: &str) -> Result<(), CollaboratorError>;

    /// Persist a new project, assigning its identity
    async fn insert_project(&self, record: ProjectRecord) -> Result<Project, CollaboratorError>;

    /// Attach a text document under a folder
    async fn attach_document(
        &self,
        project_id: ProjectId,
        folder_id: FolderId,
        file_name: &str,
        lines: &[String],
        acting_user: &UserId,
    ) -> Result<DocumentId, CollaboratorError>;

    /// Attach a binary file under a folder
    async fn attach_file(
        &self,
        project_id: ProjectId,
        folder_id: FolderId,
        file_name: &str,
        source: FileSource,
        acting_user: &UserId,
    ) -> Result<FileId, CollaboratorError>;

    /// Designate the project's root document
    async fn set_root_document(
        &self,
        project_id: ProjectId,
        document_id: DocumentId,
    ) -> Result<(), CollaboratorError>;

    /// Record provisioning progress
    async fn set_provisioning_state(
        &self,
        project_id: ProjectId,
        state: ProvisioningState,
    ) -> Result<(), CollaboratorError>;
}

/// History service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryService: Send + Sync {
    /// Allocate a history id; `None` when history is disabled for this deployment
    async fn initialize_history(&self) -> Result<Option<HistoryId>, CollaboratorError>;
}

/// User directory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user, returning only `fields`
    async fn find_user(
        &self,
        user_id: &UserId,
        fields: &[UserField],
    ) -> Result<Option<UserProfile>, CollaboratorError>;
}

/// Analytics sink
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Record an event; callers never fail on the result
    async fn record_event(
        &self,
        user_id: &UserId,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), CollaboratorError>;
}

/// The collaborators a provisioner is wired to
#[derive(Clone)]
pub struct Collaborators {
    /// Entity-tree store
    pub store: Arc<dyn EntityStore>,
    /// History service
    pub history: Arc<dyn HistoryService>,
    /// User directory
    pub users: Arc<dyn UserDirectory>,
    /// Analytics sink
    pub analytics: Arc<dyn AnalyticsSink>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
