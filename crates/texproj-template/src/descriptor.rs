//! Template descriptors: named bundles of renderable and static starter files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reserved key for the built-in example template
pub const EXAMPLE_TEMPLATE_KEY: &str = "example";

/// Fixed starter template used for basic projects
pub const BASIC_TEMPLATE: &str = "mainbasic.tex";

/// Named multi-file template
///
/// The first renderable file becomes the project's root document. Static files are
/// copied byte-for-byte after every renderable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    /// Base path relative to the templates root
    pub path: PathBuf,
    /// Renderable text files, in attach order
    #[serde(default)]
    pub template_files: Vec<String>,
    /// Opaque files copied without substitution
    #[serde(default)]
    pub static_files: Vec<String>,
}

impl TemplateDescriptor {
    /// Create descriptor with no files
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            template_files: Vec::new(),
            static_files: Vec::new(),
        }
    }

    /// Built-in example template
    #[must_use]
    pub fn example() -> Self {
        Self::new("example")
            .with_template_files(["main.tex"])
            .with_static_files(["references.bib", "universe.jpg"])
    }

    /// With renderable files
    #[must_use]
    pub fn with_template_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.template_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// With static files
    #[must_use]
    pub fn with_static_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Path of a descriptor file relative to the templates root
    #[inline]
    #[must_use]
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }

    /// Base path
    #[inline]
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.path
    }
}
