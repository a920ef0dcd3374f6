//! Provisioning configuration
//!
//! Loaded once at startup from TOML, then overridden from the environment:
//!
//! | Variable                  | Config Field                        |
//! |---------------------------|-------------------------------------|
//! | `PROJECT_HISTORY_ENABLED` | `history.display_for_new_projects`  |
//! | `TEXPROJ_CURRENT_IMAGE`   | `compile.current_image_name`        |
//! | `TEXPROJ_TEMPLATES_ROOT`  | `templates.root`                    |
//!
//! # Example Configuration
//!
//! ```toml
//! [history]
//! display_for_new_projects = true
//!
//! [compile]
//! current_image_name = "texlive-full:2017.1"
//!
//! [templates]
//! root = "/var/lib/texproj/templates"
//!
//! [templates.custom."Template 1"]
//! path = "template1/"
//! template_files = ["main.tex", "header.tex"]
//! static_files = ["example.jpg"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use texproj_template::{bundled_templates_dir, TemplateDescriptor, TemplateRegistry, TemplateRenderer};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("error reading config {}: {source}", path.display())]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("error parsing config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level provisioning configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// History linkage
    pub history: HistoryConfig,
    /// Compile environment defaults
    pub compile: CompileConfig,
    /// Template locations and custom templates
    pub templates: TemplatesConfig,
}

/// History linkage settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Show the history view for newly created projects
    pub display_for_new_projects: bool,
}

/// Compile environment settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Default compile-environment tag for new projects
    pub current_image_name: Option<String>,
}

/// Template settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Templates root; bundled templates when unset
    pub root: Option<PathBuf>,
    /// Template sources kept in memory after first read (0 disables caching)
    pub cache_capacity: u64,
    /// Custom templates by key
    pub custom: BTreeMap<String, TemplateDescriptor>,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            root: None,
            cache_capacity: 64,
            custom: BTreeMap::new(),
        }
    }
}

impl ProvisioningConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!("Loaded provisioning config from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from the process environment
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(enabled) = lookup("PROJECT_HISTORY_ENABLED") {
            self.history.display_for_new_projects = enabled == "true";
        }
        if let Some(image) = lookup("TEXPROJ_CURRENT_IMAGE").filter(|v| !v.is_empty()) {
            self.compile.current_image_name = Some(image);
        }
        if let Some(root) = lookup("TEXPROJ_TEMPLATES_ROOT").filter(|v| !v.is_empty()) {
            self.templates.root = Some(PathBuf::from(root));
        }
        self
    }

    /// With history display for new projects
    #[inline]
    #[must_use]
    pub fn with_display_history(mut self, display: bool) -> Self {
        self.history.display_for_new_projects = display;
        self
    }

    /// With default compile-environment tag
    #[inline]
    #[must_use]
    pub fn with_current_image(mut self, image_name: impl Into<String>) -> Self {
        self.compile.current_image_name = Some(image_name.into());
        self
    }

    /// With templates root
    #[inline]
    #[must_use]
    pub fn with_templates_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.templates.root = Some(root.into());
        self
    }

    /// With custom template
    #[inline]
    #[must_use]
    pub fn with_custom_template(mut self, key: impl Into<String>, descriptor: TemplateDescriptor) -> Self {
        self.templates.custom.insert(key.into(), descriptor);
        self
    }

    /// Effective templates root
    #[must_use]
    pub fn templates_root(&self) -> PathBuf {
        self.templates.root.clone().unwrap_or_else(bundled_templates_dir)
    }

    /// Build the immutable template registry
    #[must_use]
    pub fn template_registry(&self) -> TemplateRegistry {
        TemplateRegistry::new(self.templates.custom.clone())
    }

    /// Build the template renderer
    #[must_use]
    pub fn template_renderer(&self) -> TemplateRenderer {
        let renderer = TemplateRenderer::new(self.templates_root());
        match self.templates.cache_capacity {
            0 => renderer,
            capacity => renderer.with_cache(capacity),
        }
    }
}
