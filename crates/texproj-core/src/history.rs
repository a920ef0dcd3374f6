//! History linker
//!
//! Produces the history reference stored on a new project. The reference is fixed at
//! first persistence, so it is resolved before the entity factory runs.

use crate::error::ProvisionError;
use crate::ports::HistoryService;
use crate::types::{BlankProject, HistoryRef};
use std::sync::Arc;

/// Links new projects to the history subsystem
#[derive(Clone)]
pub struct HistoryLinker {
    service: Arc<dyn HistoryService>,
    display_for_new_projects: bool,
}

impl HistoryLinker {
    /// Create linker
    #[inline]
    #[must_use]
    pub fn new(service: Arc<dyn HistoryService>, display_for_new_projects: bool) -> Self {
        Self {
            service,
            display_for_new_projects,
        }
    }

    /// Request a fresh history id
    ///
    /// The id is absent when the service declines (history disabled).
    pub async fn link_new_history(&self) -> Result<HistoryRef, ProvisionError> {
        let id = self
            .service
            .initialize_history()
            .await
            .map_err(ProvisionError::History)?;

        match &id {
            Some(id) => tracing::debug!("Initialized history {}", id),
            None => tracing::debug!("History disabled, project created without history id"),
        }

        Ok(HistoryRef {
            id,
            display: self.display_for_new_projects,
        })
    }

    /// History reference for a blank project
    ///
    /// Imports keep the id they were given and never reach the service; the
    /// configured display flag still applies to them.
    pub async fn resolve(&self, origin: &BlankProject) -> Result<HistoryRef, ProvisionError> {
        match origin {
            BlankProject::Imported(imported) => {
                let history = imported.history.clone();
                let display = history.display || self.display_for_new_projects;
                Ok(history.with_display(display))
            }
            BlankProject::New(_) => self.link_new_history().await,
        }
    }
}

impl std::fmt::Debug for HistoryLinker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryLinker")
            .field("display_for_new_projects", &self.display_for_new_projects)
            .finish_non_exhaustive()
    }
}
