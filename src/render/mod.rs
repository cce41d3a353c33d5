//! Template rendering for remote upload.
//!
//! Templates are uploaded to SendGrid with their Handlebars syntax intact;
//! SendGrid evaluates variables at send time. The only thing resolved locally
//! is partial inclusion: every `{{` opener that does not introduce a partial
//! tag is escaped with a backslash before compilation, so variables,
//! conditionals and helper calls pass through as literal text while
//! `{{> name}}` references are expanded from the registered partials.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use handlebars::Handlebars;
use regex::{Captures, Regex};

use crate::core::SyncError;
use crate::templates::{PartialsConfig, logical_name, template_path};

/// Matches a mustache opener, greedily including the `>` of a partial tag
/// (`{{>`) when present.
static MUSTACHE_OPENER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{>?").expect("opener pattern is valid"));

/// Escape every mustache opener that is not a partial reference.
///
/// Only `{{> header}}` survives; `{{name}}`, `{{#if x}}`, `{{{raw}}}` and
/// friends are prefixed with `\` so the compiler treats them as literal
/// text. Block-partial openers (`{{#>`) are neutralized together with their
/// closing tags, which keeps the document balanced as literal text.
#[must_use]
pub fn escape_non_partials(source: &str) -> String {
    MUSTACHE_OPENER
        .replace_all(source, |caps: &Captures<'_>| {
            let opener = &caps[0];
            if opener.ends_with('>') {
                opener.to_string()
            } else {
                format!("\\{opener}")
            }
        })
        .into_owned()
}

/// Renders templates by logical name, expanding partials only.
///
/// Construction registers every discovered partial (escaped) into a
/// [`Handlebars`] registry; the registry is rebuilt from scratch each sync
/// run, nothing is shared across runs.
pub struct Renderer {
    registry: Handlebars<'static>,
    templates_dir: PathBuf,
}

impl Renderer {
    /// Build a renderer for one sync run, loading all partials up front.
    ///
    /// # Errors
    ///
    /// Fails if a partial cannot be read or does not compile; a single bad
    /// partial aborts the run.
    pub async fn new(
        templates_dir: &Path,
        partials: Option<&PartialsConfig>,
    ) -> Result<Self, SyncError> {
        let mut registry = Handlebars::new();

        if let Some(config) = partials {
            for path in &config.paths {
                let name = logical_name(&config.dir, path);
                let content = tokio::fs::read_to_string(path).await?;
                registry
                    .register_partial(&name, escape_non_partials(&content))
                    .map_err(|e| SyncError::TemplateParseError {
                        file: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
            }
        }

        Ok(Self {
            registry,
            templates_dir: templates_dir.to_path_buf(),
        })
    }

    /// Render the template with the given logical name.
    ///
    /// Returns the template text with partials inlined and all other
    /// Handlebars tags preserved verbatim for SendGrid to evaluate.
    pub async fn render(&self, name: &str) -> Result<String, SyncError> {
        let path = template_path(&self.templates_dir, name);
        let content = tokio::fs::read_to_string(&path).await?;
        self.registry
            .render_template(&escape_non_partials(&content), &serde_json::json!({}))
            .map_err(|e| SyncError::RenderError {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}
