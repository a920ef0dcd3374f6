//! Project entity factory
//!
//! Builds the bare project record (root folder, history reference, owner locale,
//! compile-environment tag, caller attributes) and persists it.

use crate::error::ProvisionError;
use crate::ports::{EntityStore, UserDirectory};
use crate::types::{
    Folder, HistoryRef, Project, ProjectAttributes, ProjectRecord, ProvisioningState, UserField,
    UserId,
};
use std::sync::Arc;

/// Attribute keys owned by the factory; callers cannot set them
const RESERVED_ATTRIBUTES: &[&str] = &[
    "_id",
    "id",
    "name",
    "owner_ref",
    "last_updated_by",
    "root_folder",
    "root_doc_id",
    "history",
    "spell_check_language",
    "provisioning_state",
];

/// Creates and persists blank projects
#[derive(Clone)]
pub struct EntityFactory {
    store: Arc<dyn EntityStore>,
    users: Arc<dyn UserDirectory>,
    current_image_name: Option<String>,
}

impl EntityFactory {
    /// Create factory
    #[inline]
    #[must_use]
    pub fn new(
        store: Arc<dyn EntityStore>,
        users: Arc<dyn UserDirectory>,
        current_image_name: Option<String>,
    ) -> Self {
        Self {
            store,
            users,
            current_image_name,
        }
    }

    /// Build and persist a blank project
    ///
    /// The owner is resolved before anything is written, so an unknown owner never
    /// leaves a record behind.
    pub async fn instantiate(
        &self,
        owner_id: &UserId,
        name: &str,
        history: HistoryRef,
        attributes: ProjectAttributes,
    ) -> Result<Project, ProvisionError> {
        let owner = self
            .users
            .find_user(owner_id, &[UserField::SpellCheckLanguage])
            .await
            .map_err(|source| ProvisionError::UserLookup {
                user_id: owner_id.clone(),
                source,
            })?
            .ok_or_else(|| ProvisionError::OwnerNotFound(owner_id.clone()))?;

        let record = self.build(owner_id, name, history, attributes, owner.spell_check_language);
        let project = self
            .store
            .insert_project(record)
            .await
            .map_err(ProvisionError::Persist)?;

        tracing::debug!("Persisted blank project {} for owner {}", project.id, owner_id);
        Ok(project)
    }

    /// Assemble the unpersisted record
    #[must_use]
    pub fn build(
        &self,
        owner_id: &UserId,
        name: &str,
        history: HistoryRef,
        attributes: ProjectAttributes,
        spell_check_language: Option<String>,
    ) -> ProjectRecord {
        let ProjectAttributes {
            image_name,
            mut extra,
        } = attributes;

        extra.retain(|key, _| {
            let reserved = RESERVED_ATTRIBUTES.contains(&key.as_str());
            if reserved {
                tracing::debug!("Dropping reserved attribute '{}' from caller attributes", key);
            }
            !reserved
        });

        ProjectRecord {
            name: name.to_string(),
            owner_ref: owner_id.clone(),
            last_updated_by: owner_id.clone(),
            root_folder: Folder::root(),
            root_doc_id: None,
            history,
            spell_check_language,
            image_name: image_name.or_else(|| self.current_image_name.clone()),
            attributes: extra,
            provisioning_state: ProvisioningState::Blank,
        }
    }
}

impl std::fmt::Debug for EntityFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityFactory")
            .field("current_image_name", &self.current_image_name)
            .finish_non_exhaustive()
    }
}
