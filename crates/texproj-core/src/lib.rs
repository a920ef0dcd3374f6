//! texproj Core - Project Provisioner
//!
//! Builds a new project's initial state and hands it to the systems that own it:
//! - Validates the project name against the entity store
//! - Links the project to the history service (or keeps an imported reference)
//! - Persists the bare project with its root folder
//! - Renders starter templates into documents
//! - Attaches documents and files and designates the root document
//! - Emits one analytics event per successful creation
//!
//! # Example
//!
//! ```rust,ignore
//! use texproj_core::{Collaborators, ProjectProvisioner, ProvisioningConfig, UserId};
//!
//! # async fn example(collaborators: Collaborators) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProvisioningConfig::new().with_env_overrides();
//! let provisioner = ProjectProvisioner::new(collaborators, &config);
//!
//! let owner = UserId::new("5395eb7aad1f29a88756c7f2");
//! let project = provisioner.create_from_named_template(&owner, "Thesis", "example").await?;
//! println!("Created {} with root doc {:?}", project.id, project.root_doc_id);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod config;
pub mod error;
pub mod factory;
pub mod history;
pub mod memory;
pub mod ports;
pub mod provisioner;
pub mod types;

// Re-exports for convenience
pub use config::{ConfigError, ProvisioningConfig};
pub use error::ProvisionError;
pub use factory::EntityFactory;
pub use history::HistoryLinker;
pub use ports::{AnalyticsSink, CollaboratorError, Collaborators, EntityStore, HistoryService, UserDirectory};
pub use provisioner::{ProjectProvisioner, PROJECT_CREATED_EVENT, PROJECT_IMPORTED_EVENT};
pub use types::{
    BlankProject, DocumentId, FileId, FileSource, Folder, FolderId, HistoryId, HistoryRef,
    ImportedProject, Project, ProjectAttributes, ProjectId, ProjectRecord, ProvisioningState,
    UserField, UserId, UserProfile, ROOT_DOC_NAME, ROOT_FOLDER_NAME,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with texproj Core
    pub use crate::{
        BlankProject, Collaborators, Project, ProjectAttributes, ProjectProvisioner,
        ProvisionError, ProvisioningConfig, ProvisioningState, UserId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
