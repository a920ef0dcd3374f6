//! Template renderer
//!
//! Reads a template resource below the templates root, interpolates `<%= name %>` tags
//! against a [`RenderContext`] and splits the output into lines. Only interpolation tags
//! are accepted; scriptlets (`<% ... %>`) and escaped output (`<%- ... %>`) fail the
//! render, as does any name outside the context.

use crate::context::RenderContext;
use crate::error::{RenderFault, TemplateError};
use moka::future::Cache;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<%(?P<kind>[=\-]?)\s*(?P<expr>.*?)\s*%>").expect("tag pattern is valid")
});

/// Directory holding the templates shipped with this crate
#[must_use]
pub fn bundled_templates_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"))
}

/// Renders template resources below a root directory
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    root: PathBuf,
    sources: Option<Cache<PathBuf, Arc<str>>>,
}

impl TemplateRenderer {
    /// Create renderer reading from `root` on every render
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sources: None,
        }
    }

    /// Create renderer over the bundled templates
    #[inline]
    #[must_use]
    pub fn bundled() -> Self {
        Self::new(bundled_templates_dir())
    }

    /// Cache up to `capacity` template sources after first read
    #[must_use]
    pub fn with_cache(mut self, capacity: u64) -> Self {
        self.sources = Some(Cache::new(capacity));
        self
    }

    /// Templates root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a template resource
    #[inline]
    #[must_use]
    pub fn resolve(&self, template_path: &Path) -> PathBuf {
        self.root.join(template_path)
    }

    /// Render a template into lines
    ///
    /// # Arguments
    /// * `template_path` - Resource path relative to the templates root
    /// * `context` - Substitution environment
    pub async fn render(
        &self,
        template_path: &Path,
        context: &RenderContext,
    ) -> Result<Vec<String>, TemplateError> {
        let path = self.resolve(template_path);
        let source = self.load(&path).await?;
        let rendered = substitute(&source, context).map_err(|(line, fault)| TemplateError::Render {
            path: template_path.to_path_buf(),
            line,
            fault,
        })?;
        tracing::debug!("Rendered template {}", template_path.display());
        Ok(split_lines(&rendered))
    }

    async fn load(&self, path: &Path) -> Result<Arc<str>, TemplateError> {
        if let Some(cache) = &self.sources {
            if let Some(cached) = cache.get(path).await {
                return Ok(cached);
            }
        }

        let source: Arc<str> = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| TemplateError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .into();

        if let Some(cache) = &self.sources {
            cache.insert(path.to_path_buf(), Arc::clone(&source)).await;
        }
        Ok(source)
    }
}

/// Interpolate every tag in `source`
///
/// On failure returns the 1-based line of the offending tag with the fault.
pub fn substitute(source: &str, context: &RenderContext) -> Result<String, (usize, RenderFault)> {
    let mut output = String::with_capacity(source.len());
    let mut last = 0;

    for caps in TAG.captures_iter(source) {
        let (Some(tag), Some(kind), Some(expr)) = (caps.get(0), caps.name("kind"), caps.name("expr"))
        else {
            continue;
        };
        let literal = &source[last..tag.start()];
        if let Some(offset) = literal.find("<%") {
            return Err((line_at(source, last + offset), RenderFault::Unterminated));
        }
        output.push_str(literal);

        if kind.as_str() != "=" {
            return Err((
                line_at(source, tag.start()),
                RenderFault::UnsupportedTag(tag.as_str().to_string()),
            ));
        }
        let value = context.resolve(expr.as_str()).ok_or_else(|| {
            (
                line_at(source, tag.start()),
                RenderFault::UnknownPlaceholder(expr.as_str().to_string()),
            )
        })?;
        output.push_str(&value);
        last = tag.end();
    }

    let rest = &source[last..];
    if let Some(offset) = rest.find("<%") {
        return Err((line_at(source, last + offset), RenderFault::Unterminated));
    }
    output.push_str(rest);
    Ok(output)
}

/// Split on `\n` only; a trailing newline yields a final empty line
#[must_use]
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UserProjection;
    use chrono::Month;
    use proptest::prelude::*;

    fn demo_context() -> RenderContext {
        RenderContext::new("Demo", UserProjection::new("A", "B"), 2024, Month::March)
    }

    #[test]
    fn substitute_replaces_all_placeholders() {
        let source = "\\title{<%= project_name %>}\n\\author{<%= user.first_name %> <%= user.last_name %>}\n\\date{<%= month %> <%= year %>}\n";
        let rendered = substitute(source, &demo_context()).unwrap();

        assert_eq!(rendered, "\\title{Demo}\n\\author{A B}\n\\date{March 2024}\n");
        assert_eq!(split_lines(&rendered).len(), 4);
        assert_eq!(split_lines(&rendered).last().map(String::as_str), Some(""));
    }

    #[test]
    fn substitute_tolerates_tag_whitespace() {
        let rendered = substitute("<%=project_name%>|<%=   year   %>", &demo_context()).unwrap();
        assert_eq!(rendered, "Demo|2024");
    }

    #[test]
    fn unknown_placeholder_fails_with_line() {
        let err = substitute("ok\n<%= user.email %>", &demo_context()).unwrap_err();
        assert_eq!(err, (2, RenderFault::UnknownPlaceholder("user.email".to_string())));
    }

    #[test]
    fn scriptlets_are_rejected() {
        let err = substitute("<% print(1) %>", &demo_context()).unwrap_err();
        assert!(matches!(err.1, RenderFault::UnsupportedTag(_)));

        let err = substitute("<%- project_name %>", &demo_context()).unwrap_err();
        assert!(matches!(err.1, RenderFault::UnsupportedTag(_)));
    }

    #[test]
    fn unterminated_tag_fails() {
        let err = substitute("a\nb\n<%= project_name", &demo_context()).unwrap_err();
        assert_eq!(err, (3, RenderFault::Unterminated));
    }

    #[test]
    fn split_preserves_trailing_empty_line() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b", ""]);
        assert_eq!(split_lines("a\r\nb"), vec!["a\r", "b"]);
        assert_eq!(split_lines(""), vec![""]);
    }

    #[tokio::test]
    async fn render_reads_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tex"), "% <%= project_name %>\n").unwrap();

        let renderer = TemplateRenderer::new(dir.path());
        let lines = renderer
            .render(Path::new("main.tex"), &demo_context())
            .await
            .unwrap();
        assert_eq!(lines, vec!["% Demo", ""]);
    }

    #[tokio::test]
    async fn render_missing_template_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = TemplateRenderer::new(dir.path());

        let err = renderer
            .render(Path::new("nope.tex"), &demo_context())
            .await
            .unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }));
    }

    #[tokio::test]
    async fn cached_renderer_reuses_source() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.tex");
        std::fs::write(&file, "<%= year %>").unwrap();

        let renderer = TemplateRenderer::new(dir.path()).with_cache(8);
        let first = renderer.render(Path::new("main.tex"), &demo_context()).await.unwrap();
        std::fs::remove_file(&file).unwrap();
        let second = renderer.render(Path::new("main.tex"), &demo_context()).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn bundled_basic_template_renders() {
        let renderer = TemplateRenderer::bundled();
        let lines = renderer
            .render(Path::new(crate::BASIC_TEMPLATE), &demo_context())
            .await
            .unwrap();

        assert!(lines.contains(&"\\title{Demo}".to_string()));
        assert!(lines.contains(&"\\author{A B}".to_string()));
        assert!(lines.contains(&"\\date{March 2024}".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some(""));
    }

    proptest! {
        #[test]
        fn literal_text_round_trips(text in "[a-zA-Z0-9 {}\\\\\n%=]{0,200}") {
            prop_assume!(!text.contains("<%"));
            let rendered = substitute(&text, &demo_context()).unwrap();
            prop_assert_eq!(&rendered, &text);
            prop_assert_eq!(split_lines(&rendered).len(), text.matches('\n').count() + 1);
        }
    }
}
