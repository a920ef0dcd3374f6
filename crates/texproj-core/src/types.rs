//! Core types for project provisioning
//!
//! Defines:
//! - Entity identifiers
//! - The project record before and after persistence
//! - History references and provisioning state
//! - Blank-project variants (new vs imported)
//! - User profile projections

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use texproj_template::UserProjection;
use ulid::Ulid;

/// Reserved name of every project's root folder
pub const ROOT_FOLDER_NAME: &str = "rootFolder";

/// Conventional file name of the root document
pub const ROOT_DOC_NAME: &str = "main.tex";

macro_rules! ulid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Ulid);

        impl $name {
            /// Generate new ID
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

ulid_id!(
    /// Project identifier, assigned by the store on insert
    ProjectId
);
ulid_id!(
    /// Folder identifier
    FolderId
);
ulid_id!(
    /// Document identifier
    DocumentId
);
ulid_id!(
    /// Binary file identifier
    FileId
);

/// User identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Create user ID
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable history identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryId(pub String);

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Link between a project and the history subsystem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRef {
    /// History id, absent when history is disabled
    pub id: Option<HistoryId>,
    /// Whether the history view is shown for this project
    pub display: bool,
}

impl HistoryRef {
    /// Create reference to an existing history
    #[inline]
    #[must_use]
    pub fn linked(id: impl Into<String>) -> Self {
        Self {
            id: Some(HistoryId(id.into())),
            display: false,
        }
    }

    /// With display flag
    #[inline]
    #[must_use]
    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }
}

/// How far provisioning got for a persisted project
///
/// Records left in `Blank` or `ContentAttached` by a failed operation can be found
/// and reconciled by operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProvisioningState {
    /// Persisted with a root folder only
    Blank,
    /// Documents and files attached, root document not yet designated
    ContentAttached,
    /// Fully provisioned
    Complete,
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blank => "blank",
            Self::ContentAttached => "contentAttached",
            Self::Complete => "complete",
        })
    }
}

/// Named container node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Folder ID
    pub id: FolderId,
    /// Folder name
    pub name: String,
}

impl Folder {
    /// Create fresh root folder
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self {
            id: FolderId::new(),
            name: ROOT_FOLDER_NAME.to_string(),
        }
    }
}

/// Project record built by the entity factory, not yet persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Display name
    pub name: String,
    /// Owner
    pub owner_ref: UserId,
    /// Last user to modify the project
    pub last_updated_by: UserId,
    /// The single root folder
    pub root_folder: Folder,
    /// Main document, once designated
    pub root_doc_id: Option<DocumentId>,
    /// History linkage
    pub history: HistoryRef,
    /// Spell-check locale copied from the owner
    pub spell_check_language: Option<String>,
    /// Compile-environment tag
    pub image_name: Option<String>,
    /// Caller-supplied attributes
    pub attributes: BTreeMap<String, Value>,
    /// Provisioning progress
    pub provisioning_state: ProvisioningState,
}

impl ProjectRecord {
    /// Attach the identity assigned by the store
    #[must_use]
    pub fn persisted(self, id: ProjectId) -> Project {
        Project {
            id,
            name: self.name,
            owner_ref: self.owner_ref,
            last_updated_by: self.last_updated_by,
            root_folder: self.root_folder,
            root_doc_id: self.root_doc_id,
            history: self.history,
            spell_check_language: self.spell_check_language,
            image_name: self.image_name,
            attributes: self.attributes,
            provisioning_state: self.provisioning_state,
        }
    }
}

/// Persisted project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project ID
    pub id: ProjectId,
    /// Display name
    pub name: String,
    /// Owner
    pub owner_ref: UserId,
    /// Last user to modify the project
    pub last_updated_by: UserId,
    /// The single root folder
    pub root_folder: Folder,
    /// Main document, once designated
    pub root_doc_id: Option<DocumentId>,
    /// History linkage
    pub history: HistoryRef,
    /// Spell-check locale copied from the owner
    pub spell_check_language: Option<String>,
    /// Compile-environment tag
    pub image_name: Option<String>,
    /// Caller-supplied attributes
    pub attributes: BTreeMap<String, Value>,
    /// Provisioning progress
    pub provisioning_state: ProvisioningState,
}

impl Project {
    /// Check if the project is fully provisioned
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.provisioning_state == ProvisioningState::Complete
    }
}

/// Caller-supplied project attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectAttributes {
    /// Compile-environment tag; the configured default applies when absent
    pub image_name: Option<String>,
    /// Free-form attributes merged into the record
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ProjectAttributes {
    /// Create empty attributes
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With compile-environment tag
    #[inline]
    #[must_use]
    pub fn with_image_name(mut self, image_name: impl Into<String>) -> Self {
        self.image_name = Some(image_name.into());
        self
    }

    /// With free-form attribute
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Imported project carrying its own history reference
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedProject {
    /// History reference supplied by the importer
    pub history: HistoryRef,
    /// Attributes, e.g. import provenance
    pub attributes: ProjectAttributes,
}

/// Blank-project variants
#[derive(Debug, Clone, PartialEq)]
pub enum BlankProject {
    /// Fresh project; history is linked on creation
    New(ProjectAttributes),
    /// Imported project; history linkage is skipped
    Imported(ImportedProject),
}

impl BlankProject {
    /// Create new project with attributes
    #[inline]
    #[must_use]
    pub fn new(attributes: ProjectAttributes) -> Self {
        Self::New(attributes)
    }

    /// Create imported project
    #[inline]
    #[must_use]
    pub fn imported(history: HistoryRef, attributes: ProjectAttributes) -> Self {
        Self::Imported(ImportedProject {
            history,
            attributes,
        })
    }

    /// Caller-supplied attributes
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &ProjectAttributes {
        match self {
            Self::New(attributes) => attributes,
            Self::Imported(imported) => &imported.attributes,
        }
    }

    /// Check if this is an import
    #[inline]
    #[must_use]
    pub fn is_import(&self) -> bool {
        matches!(self, Self::Imported(_))
    }
}

impl Default for BlankProject {
    fn default() -> Self {
        Self::New(ProjectAttributes::default())
    }
}

/// Profile fields the provisioner may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    /// Spell-check locale
    SpellCheckLanguage,
    /// First name
    FirstName,
    /// Last name
    LastName,
}

/// User profile as returned by the directory, limited to requested fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID
    pub id: UserId,
    /// Spell-check locale
    pub spell_check_language: Option<String>,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
}

impl UserProfile {
    /// Create profile with no optional fields
    #[inline]
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// With names
    #[inline]
    #[must_use]
    pub fn with_names(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }

    /// With spell-check locale
    #[inline]
    #[must_use]
    pub fn with_spell_check_language(mut self, language: impl Into<String>) -> Self {
        self.spell_check_language = Some(language.into());
        self
    }

    /// Keep only the requested fields
    #[must_use]
    pub fn project(&self, fields: &[UserField]) -> Self {
        let wants = |field| fields.contains(&field);
        Self {
            id: self.id.clone(),
            spell_check_language: self
                .spell_check_language
                .clone()
                .filter(|_| wants(UserField::SpellCheckLanguage)),
            first_name: self.first_name.clone().filter(|_| wants(UserField::FirstName)),
            last_name: self.last_name.clone().filter(|_| wants(UserField::LastName)),
        }
    }

    /// Name projection for template rendering
    #[inline]
    #[must_use]
    pub fn to_projection(&self) -> UserProjection {
        UserProjection {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Content of an attached binary file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Copy from a path on disk
    Path(PathBuf),
    /// Use these bytes
    Bytes(Vec<u8>),
}
