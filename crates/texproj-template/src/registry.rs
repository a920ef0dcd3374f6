//! Template registry
//!
//! Provides [`TemplateRegistry`], an immutable key → descriptor table built once at
//! startup and handed to the provisioner.

use crate::descriptor::{TemplateDescriptor, EXAMPLE_TEMPLATE_KEY};
use crate::error::TemplateError;
use std::collections::BTreeMap;

/// Immutable lookup table of named templates
///
/// The reserved [`EXAMPLE_TEMPLATE_KEY`] always resolves to the built-in example,
/// even if a custom entry uses the same key.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    example: TemplateDescriptor,
    custom: BTreeMap<String, TemplateDescriptor>,
}

impl TemplateRegistry {
    /// Create registry from custom descriptors
    #[must_use]
    pub fn new<I, K>(custom: I) -> Self
    where
        I: IntoIterator<Item = (K, TemplateDescriptor)>,
        K: Into<String>,
    {
        let mut table = BTreeMap::new();
        for (key, descriptor) in custom {
            let key = key.into();
            if key == EXAMPLE_TEMPLATE_KEY {
                tracing::warn!("Ignoring custom template under reserved key '{}'", key);
                continue;
            }
            table.insert(key, descriptor);
        }
        Self {
            example: TemplateDescriptor::example(),
            custom: table,
        }
    }

    /// Create registry holding only the built-in example
    #[inline]
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(std::iter::empty::<(String, TemplateDescriptor)>())
    }

    /// Resolve a template key
    pub fn resolve(&self, key: &str) -> Result<&TemplateDescriptor, TemplateError> {
        if key == EXAMPLE_TEMPLATE_KEY {
            return Ok(&self.example);
        }
        self.custom.get(key).ok_or_else(|| TemplateError::NotFound {
            key: key.to_string(),
        })
    }

    /// Check if key resolves
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        key == EXAMPLE_TEMPLATE_KEY || self.custom.contains_key(key)
    }

    /// Custom template keys, sorted
    pub fn custom_keys(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }

    /// Number of custom templates
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.custom.len()
    }

    /// Check if no custom templates are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.custom.is_empty()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
