//! Error types for project provisioning
//!
//! Every failure is tagged with the provisioning stage it came from and returned to
//! the caller; nothing is retried or rolled back here.

use crate::ports::CollaboratorError;
use crate::types::{ProjectId, ProvisioningState, UserId};
use std::path::PathBuf;
use texproj_template::{RenderFault, TemplateError};

/// Context tag for failures while attaching or designating the root document
pub const ROOT_DOC_CONTEXT: &str = "error adding root doc when creating project";

/// Context tag for failures while attaching secondary template documents
pub const TEMPLATE_DOC_CONTEXT: &str = "error adding template doc when creating project";

/// Context tag for failures while attaching static template files
pub const TEMPLATE_FILE_CONTEXT: &str = "error adding template file when creating project";

/// Main provisioning error type
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Project name rejected
    #[error("invalid project name: {0}")]
    InvalidProjectName(String),

    /// Owner does not resolve to a user profile
    #[error("owner not found: {0}")]
    OwnerNotFound(UserId),

    /// Template key not reserved and not registered
    #[error("template not found: {key}")]
    TemplateNotFound {
        /// Requested key
        key: String,
    },

    /// Template declares no renderable files
    #[error("template has no renderable files: {key}")]
    TemplateEmpty {
        /// Requested key
        key: String,
    },

    /// Template resource could not be read
    #[error("error reading template {}: {source}", path.display())]
    TemplateRead {
        /// Resolved resource path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Template source could not be rendered
    #[error("error rendering template {} at line {line}: {fault}", path.display())]
    TemplateRender {
        /// Template path
        path: PathBuf,
        /// 1-based line of the offending tag
        line: usize,
        /// What went wrong
        fault: RenderFault,
    },

    /// Store failed while attaching entities to a persisted project
    #[error("{context}: {source}")]
    EntityAttach {
        /// Provisioning-stage tag
        context: &'static str,
        /// Partially provisioned project
        project_id: ProjectId,
        /// Store failure
        #[source]
        source: CollaboratorError,
    },

    /// Store failed to validate the name
    #[error("error validating project name: {0}")]
    NameValidation(#[source] CollaboratorError),

    /// Directory failed to look up a user
    #[error("error looking up user {user_id}: {source}")]
    UserLookup {
        /// Requested user
        user_id: UserId,
        /// Directory failure
        #[source]
        source: CollaboratorError,
    },

    /// History service failed
    #[error("error initializing project history: {0}")]
    History(#[source] CollaboratorError),

    /// Store failed to persist the blank project
    #[error("error saving project: {0}")]
    Persist(#[source] CollaboratorError),

    /// Store failed to record provisioning progress
    #[error("error marking project {project_id} as {state}: {source}")]
    StateUpdate {
        /// Partially provisioned project
        project_id: ProjectId,
        /// State that could not be recorded
        state: ProvisioningState,
        /// Store failure
        #[source]
        source: CollaboratorError,
    },
}

impl ProvisionError {
    /// Check if the caller can fix the request and retry
    #[inline]
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidProjectName(_))
    }

    /// Check if the failure points at template configuration or deployment
    #[inline]
    #[must_use]
    pub fn is_template_error(&self) -> bool {
        matches!(
            self,
            Self::TemplateNotFound { .. }
                | Self::TemplateEmpty { .. }
                | Self::TemplateRead { .. }
                | Self::TemplateRender { .. }
        )
    }

    /// Project left behind in a non-complete provisioning state, if any
    #[inline]
    #[must_use]
    pub fn partial_project(&self) -> Option<ProjectId> {
        match self {
            Self::EntityAttach { project_id, .. } | Self::StateUpdate { project_id, .. } => {
                Some(*project_id)
            }
            _ => None,
        }
    }

    pub(crate) fn attach(
        context: &'static str,
        project_id: ProjectId,
    ) -> impl FnOnce(CollaboratorError) -> Self {
        move |source| Self::EntityAttach {
            context,
            project_id,
            source,
        }
    }
}

impl From<TemplateError> for ProvisionError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound { key } => Self::TemplateNotFound { key },
            TemplateError::Read { path, source } => Self::TemplateRead { path, source },
            TemplateError::Render { path, line, fault } => Self::TemplateRender { path, line, fault },
        }
    }
}
