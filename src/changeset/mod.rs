//! Changeset generation: raw file events to template-level operations.
//!
//! This is the change-propagation core. A [`ChangesetGenerator`] is
//! constructed once per sync run with the discovered template set and the
//! reverse dependency map, and then translates a [`FileEvents`] batch into a
//! minimal, deduplicated [`Changeset`]:
//!
//! - added template files become `created`
//! - deleted template files become `deleted`
//! - renamed files become `renamed` pairs of logical names
//! - modified template files, plus every template depending on an added,
//!   modified, deleted or renamed-to partial, become `updated`
//!
//! A name never appears in more than one of `created`/`updated`/`deleted`:
//! templates that were just created or deleted are subtracted from `updated`
//! even when a changed partial also implicates them. `generate` is a pure
//! function of the graph and the events, so repeated invocations (one per CI
//! trigger) yield identical output without rebuilding the graph.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::graph::DependencyMaps;
use crate::templates::{PartialsConfig, TemplateSet, logical_name};

/// A renamed file, both sides absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedFile {
    /// Previous path.
    pub from: PathBuf,
    /// New path.
    pub to: PathBuf,
}

/// Raw file-level events for one sync run, as supplied by the history-diff
/// collaborator. All paths are absolute `.hbs` paths; every bucket defaults
/// to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEvents {
    /// Files added since the last sync point.
    pub added: Vec<PathBuf>,
    /// Files modified since the last sync point.
    pub modified: Vec<PathBuf>,
    /// Files deleted since the last sync point.
    pub deleted: Vec<PathBuf>,
    /// Files renamed since the last sync point.
    pub renamed: Vec<RenamedFile>,
}

/// A renamed template as a pair of logical names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedName {
    /// Previous logical name.
    pub from: String,
    /// New logical name.
    pub to: String,
}

/// The template-level operation set derived from raw file events.
///
/// Invariant: `created`, `updated` and `deleted` are pairwise disjoint.
/// `renamed` may overlap with `updated` (renaming a template while modifying
/// its destination reports both).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Changeset {
    /// Logical names of templates to create remotely.
    pub created: Vec<String>,
    /// Logical names of templates needing a new version.
    pub updated: Vec<String>,
    /// Logical names of templates to delete remotely.
    pub deleted: Vec<String>,
    /// Template renames to apply remotely.
    pub renamed: Vec<RenamedName>,
}

impl Changeset {
    /// Whether the changeset contains no operations at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.deleted.is_empty()
            && self.renamed.is_empty()
    }
}

/// Translates file events into changesets against a fixed dependency graph.
///
/// Holds the full discovered template and partial path lists so events can be
/// partitioned by list membership rather than directory heuristics.
#[derive(Debug, Clone)]
pub struct ChangesetGenerator {
    templates_dir: PathBuf,
    template_paths: Vec<PathBuf>,
    partials: Option<PartialsConfig>,
    partial_deps: BTreeMap<String, Vec<String>>,
}

impl ChangesetGenerator {
    /// Create a generator from explicit parts.
    #[must_use]
    pub fn new(
        templates_dir: PathBuf,
        template_paths: Vec<PathBuf>,
        partials: Option<PartialsConfig>,
        partial_deps: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            templates_dir,
            template_paths,
            partials,
            partial_deps,
        }
    }

    /// Create a generator from a discovered template set and its dependency
    /// maps.
    #[must_use]
    pub fn from_discovery(set: &TemplateSet, maps: &DependencyMaps) -> Self {
        Self::new(
            set.templates_dir.clone(),
            set.templates.clone(),
            set.partials.clone(),
            maps.partial_deps.clone(),
        )
    }

    /// Compute the changeset for one batch of file events.
    ///
    /// Pure with respect to the generator's fixed context; calling twice with
    /// the same events yields identical output.
    #[must_use]
    pub fn generate(&self, events: &FileEvents) -> Changeset {
        let created = self.template_names_in(&events.added);
        let deleted = self.template_names_in(&events.deleted);
        let modified = self.template_names_in(&events.modified);

        let renamed: Vec<RenamedName> = events
            .renamed
            .iter()
            .map(|r| RenamedName {
                from: self.template_name(&r.from),
                to: self.template_name(&r.to),
            })
            .collect();

        // Every template depending on a touched partial needs a new version.
        let triggered = self.partial_triggered_updates(events);

        let excluded: HashSet<&String> = created.iter().chain(deleted.iter()).collect();
        let mut seen = HashSet::new();
        let updated = modified
            .into_iter()
            .chain(triggered)
            .filter(|name| !excluded.contains(name) && seen.insert(name.clone()))
            .collect();

        Changeset {
            created,
            updated,
            deleted,
            renamed,
        }
    }

    /// Logical names of the templates whose dependencies were touched by a
    /// partial-level event. Empty when no partials directory is configured.
    fn partial_triggered_updates(&self, events: &FileEvents) -> Vec<String> {
        let Some(ref partials) = self.partials else {
            return Vec::new();
        };

        let renamed_to: Vec<&PathBuf> = events.renamed.iter().map(|r| &r.to).collect();
        let touched = |path: &PathBuf| {
            events.added.contains(path)
                || events.modified.contains(path)
                || events.deleted.contains(path)
                || renamed_to.contains(&path)
        };

        let mut dependents = Vec::new();
        for path in partials.paths.iter().filter(|p| touched(p)) {
            let name = logical_name(&partials.dir, path);
            if let Some(templates) = self.partial_deps.get(&name) {
                dependents.extend(templates.iter().cloned());
            }
        }
        dependents
    }

    /// Partition `paths` down to known template paths, resolved to logical
    /// names in discovery order.
    fn template_names_in(&self, paths: &[PathBuf]) -> Vec<String> {
        self.template_paths
            .iter()
            .filter(|p| paths.contains(p))
            .map(|p| self.template_name(p))
            .collect()
    }

    fn template_name(&self, path: &Path) -> String {
        logical_name(&self.templates_dir, path)
    }
}
