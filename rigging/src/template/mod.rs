//! Template rendering and marker merges
//!
//! Placeholders use handlebars syntax (`{{name}}`) with strict mode on and
//! HTML escaping off, since the output is source code. A placeholder without
//! a value is a hard error rather than an empty string.

mod builtin;
mod catalogue;
mod marker;

pub use builtin::CATALOGUE as BUILTIN_TEMPLATES;
pub use catalogue::{DirectoryTemplates, EmbeddedTemplates, Template, TemplateSource};
pub use marker::{marker_line, merge_at_marker, MergeOutcome, MARKER_TAG};

#[cfg(test)]
pub use catalogue::MockTemplateSource;

use crate::error::{Error, Result};
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Placeholder values for one render
pub type Variables = BTreeMap<String, String>;

/// Header every generator-owned file carries
pub const GENERATED_HEADER: &str = "@generated by rigging";

static PLACEHOLDER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\\?\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").ok());

const KEYWORDS: &[&str] = &["else", "this"];

/// Placeholder renderer
pub struct Renderer {
    registry: Handlebars<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

impl Renderer {
    /// Create a renderer with strict mode enabled and escaping disabled
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    /// Render a catalogue template
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedVariable`] for a placeholder missing from
    /// `variables`, [`Error::Template`] for malformed template syntax.
    pub fn render(&self, template: &Template, variables: &Variables) -> Result<String> {
        self.render_str(&template.id, &template.body, variables)
    }

    /// Render an ad-hoc template body
    ///
    /// ```
    /// use rigging::template::{Renderer, Variables};
    ///
    /// let mut vars = Variables::new();
    /// vars.insert("name".into(), "Post".into());
    /// let out = Renderer::new().render_str("inline", "struct {{name}};", &vars).unwrap();
    /// assert_eq!(out, "struct Post;");
    /// ```
    pub fn render_str(&self, id: &str, body: &str, variables: &Variables) -> Result<String> {
        if let Some(name) = unresolved(body, variables) {
            return Err(Error::UnresolvedVariable {
                template: id.to_string(),
                name,
            });
        }
        self.registry
            .render_template(body, variables)
            .map_err(|e| Error::Template {
                template: id.to_string(),
                message: e.to_string(),
            })
    }
}

fn unresolved(body: &str, variables: &Variables) -> Option<String> {
    let pattern = PLACEHOLDER.as_ref()?;
    pattern
        .captures_iter(body)
        .filter(|c| c.get(0).is_some_and(|m| !m.as_str().starts_with('\\')))
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .find(|name| !KEYWORDS.contains(name) && !variables.contains_key(*name))
        .map(str::to_string)
}

/// Render a template with free-standing variables
///
/// Convenience wrapper around a fresh [`Renderer`].
pub fn render(template: &str, variables: &Variables) -> Result<String> {
    Renderer::new().render_str("inline", template, variables)
}
