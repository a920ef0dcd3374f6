//! Error types for template resolution and rendering

use std::path::PathBuf;

/// Template error type
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Template key is neither reserved nor registered
    #[error("template not found: {key}")]
    NotFound {
        /// Requested template key
        key: String,
    },

    /// Template resource could not be read
    #[error("error reading template {}: {source}", path.display())]
    Read {
        /// Resolved resource path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Template source could not be rendered
    #[error("error rendering template {} at line {line}: {fault}", path.display())]
    Render {
        /// Resolved resource path
        path: PathBuf,
        /// 1-based line of the offending tag
        line: usize,
        /// What went wrong
        fault: RenderFault,
    },
}

impl TemplateError {
    /// Check if the template key failed to resolve
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Rendering faults found while scanning a template source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderFault {
    /// Interpolation names a variable outside the render context
    #[error("unknown placeholder `{0}`")]
    UnknownPlaceholder(String),

    /// Tag other than `<%= ... %>` (scriptlets and escaped output are rejected)
    #[error("unsupported tag `{0}`")]
    UnsupportedTag(String),

    /// `<%` opened with no closing `%>`
    #[error("unterminated tag")]
    Unterminated,
}
