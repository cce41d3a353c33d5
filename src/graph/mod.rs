//! Template-to-partial dependency graph.
//!
//! The graph is two-level and fixed in shape: a forward map from each
//! template's logical name to the partial names it references, and the
//! derived reverse map from each partial name to the templates that reference
//! it. It is built once per sync run from the discovered template set and is
//! immutable afterward; the changeset generator consults only the reverse map
//! to propagate partial changes to dependent templates.

use std::collections::BTreeMap;
use std::path::Path;

use handlebars::template::{Parameter, Template, TemplateElement};

use crate::core::SyncError;
use crate::render::escape_non_partials;
use crate::templates::logical_name;

/// Forward and reverse dependency maps for one sync run.
#[derive(Debug, Clone, Default)]
pub struct DependencyMaps {
    /// template name -> partial names it references, in document order.
    /// Duplicate references are preserved per occurrence.
    pub template_deps: BTreeMap<String, Vec<String>>,
    /// partial name -> template names referencing it, in template discovery
    /// order, deduplicated per template.
    pub partial_deps: BTreeMap<String, Vec<String>>,
}

impl DependencyMaps {
    /// Build both maps by extracting partial references from every template.
    ///
    /// Deterministic for a given file set and content; performs no network
    /// access. `template_paths` must be in discovery order (lexicographic),
    /// which fixes the order of the reverse map's dependent lists.
    ///
    /// # Errors
    ///
    /// A single template that fails to read or parse aborts the build.
    pub async fn build(
        templates_dir: &Path,
        template_paths: &[std::path::PathBuf],
    ) -> Result<Self, SyncError> {
        let mut template_deps = BTreeMap::new();
        let mut partial_deps: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for path in template_paths {
            let name = logical_name(templates_dir, path);
            let deps = extract_partial_refs(path).await?;

            for dep in &deps {
                let dependents = partial_deps.entry(dep.clone()).or_default();
                if !dependents.contains(&name) {
                    dependents.push(name.clone());
                }
            }
            template_deps.insert(name, deps);
        }

        Ok(Self {
            template_deps,
            partial_deps,
        })
    }
}

/// Extract the partial names referenced by one template, in document order.
///
/// The template text is escaped so that only partial tags compile as
/// Handlebars syntax, then parsed; every partial node at the top level of the
/// syntax tree contributes its referenced name. Duplicates are preserved if a
/// partial is referenced more than once.
pub async fn extract_partial_refs(path: &Path) -> Result<Vec<String>, SyncError> {
    let content = tokio::fs::read_to_string(path).await?;
    let template = Template::compile(&escape_non_partials(&content)).map_err(|e| {
        SyncError::TemplateParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    Ok(template
        .elements
        .iter()
        .filter_map(|element| match element {
            TemplateElement::PartialExpression(partial)
            | TemplateElement::PartialBlock(partial) => parameter_name(&partial.name),
            _ => None,
        })
        .collect())
}

fn parameter_name(parameter: &Parameter) -> Option<String> {
    parameter.as_name().map(str::to_string)
}
