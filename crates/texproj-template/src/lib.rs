//! texproj Template - starter content for new projects
//!
//! Provides:
//! - [`TemplateDescriptor`]: a named bundle of renderable and static files
//! - [`TemplateRegistry`]: immutable key → descriptor table, built once at startup
//! - [`RenderContext`]: the closed set of variables a template may use
//! - [`TemplateRenderer`]: reads, interpolates and line-splits template resources
//!
//! # Example
//!
//! ```rust,ignore
//! use texproj_template::{RenderContext, TemplateRenderer, UserProjection, BASIC_TEMPLATE};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let renderer = TemplateRenderer::bundled();
//! let context = RenderContext::now("Thesis", UserProjection::new("Ada", "Lovelace"));
//! let lines = renderer.render(BASIC_TEMPLATE.as_ref(), &context).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod context;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod renderer;

pub use context::{RenderContext, UserProjection};
pub use descriptor::{TemplateDescriptor, BASIC_TEMPLATE, EXAMPLE_TEMPLATE_KEY};
pub use error::{RenderFault, TemplateError};
pub use registry::TemplateRegistry;
pub use renderer::{bundled_templates_dir, split_lines, substitute, TemplateRenderer};
