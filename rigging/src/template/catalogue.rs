//! Template lookup
//!
//! Templates are resolved by id through a [`TemplateSource`]. The built-in
//! catalogue is always available; a directory of `<id>.hbs` files can override
//! individual entries.

use super::builtin;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};

static VERSION_HEADER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\{\{!--\s*version:\s*(\d+)\s*--\}\}\r?\n?").ok());

/// A named, versioned template body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Catalogue id (`model`, `routes_entry`, ...)
    pub id: String,
    /// Body revision; built-ins are version 1
    pub version: u32,
    /// Handlebars source
    pub body: String,
}

impl Template {
    /// Create a template
    #[must_use]
    pub fn new(id: impl Into<String>, version: u32, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version,
            body: body.into(),
        }
    }

    /// Parse a template file, honouring a leading `{{!-- version: N --}}` line
    ///
    /// ```
    /// use rigging::template::Template;
    ///
    /// let t = Template::parse("model", "{{!-- version: 3 --}}\nbody");
    /// assert_eq!(t.version, 3);
    /// assert_eq!(t.body, "body");
    /// ```
    #[must_use]
    pub fn parse(id: &str, source: &str) -> Self {
        let header = VERSION_HEADER.as_ref().and_then(|re| re.captures(source));
        match header {
            Some(captures) => {
                let version = captures
                    .get(1)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(1);
                let consumed = captures.get(0).map_or(0, |m| m.end());
                Self::new(id, version, &source[consumed..])
            }
            None => Self::new(id, 1, source),
        }
    }
}

/// Resolves template ids to templates
#[cfg_attr(test, mockall::automock)]
pub trait TemplateSource: Send + Sync {
    /// Look up a template
    ///
    /// # Errors
    ///
    /// [`Error::UnknownTemplate`] if the id is not in the catalogue.
    fn resolve(&self, id: &str) -> Result<Template>;
}

/// The templates compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplates;

impl EmbeddedTemplates {
    /// Ids of every built-in template
    #[must_use]
    pub fn ids() -> Vec<&'static str> {
        builtin::CATALOGUE.iter().map(|(id, _)| *id).collect()
    }
}

impl TemplateSource for EmbeddedTemplates {
    fn resolve(&self, id: &str) -> Result<Template> {
        builtin::lookup(id)
            .map(|body| Template::new(id, 1, body))
            .ok_or_else(|| Error::UnknownTemplate(id.to_string()))
    }
}

/// User overrides read from `<dir>/<id>.hbs`, falling back to the built-ins
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    dir: PathBuf,
    fallback: EmbeddedTemplates,
}

impl DirectoryTemplates {
    /// Overlay templates from `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fallback: EmbeddedTemplates,
        }
    }

    /// `$XDG_CONFIG_HOME/rigging/templates` (or the platform equivalent)
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rigging").join("templates"))
    }

    /// Override directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TemplateSource for DirectoryTemplates {
    fn resolve(&self, id: &str) -> Result<Template> {
        let path = self.dir.join(format!("{id}.hbs"));
        match std::fs::read_to_string(&path) {
            Ok(source) => {
                tracing::debug!(template = id, path = %path.display(), "Using template override");
                Ok(Template::parse(id, &source))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.fallback.resolve(id),
            Err(e) => Err(Error::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalogue_resolves_every_id() {
        for id in EmbeddedTemplates::ids() {
            let template = EmbeddedTemplates.resolve(id).unwrap();
            assert_eq!(template.id, id);
            assert_eq!(template.version, 1);
        }
    }

    #[test]
    fn test_unknown_template() {
        assert!(matches!(
            EmbeddedTemplates.resolve("nope"),
            Err(Error::UnknownTemplate(_))
        ));
    }

    #[test]
    fn test_directory_override_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("model.hbs"),
            "{{!-- version: 2 --}}\n// custom {{singular_capitalized}}\n",
        )
        .unwrap();

        let source = DirectoryTemplates::new(dir.path());
        let model = source.resolve("model").unwrap();
        assert_eq!(model.version, 2);
        assert_eq!(model.body, "// custom {{singular_capitalized}}\n");

        let handler = source.resolve("handler").unwrap();
        assert_eq!(handler.body, builtin::HANDLER);
    }

    #[test]
    fn test_parse_without_header() {
        let t = Template::parse("x", "plain {{a}}");
        assert_eq!(t.version, 1);
        assert_eq!(t.body, "plain {{a}}");
    }
}
