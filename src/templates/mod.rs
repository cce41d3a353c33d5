//! Template and partial discovery.
//!
//! Enumerates `*.hbs` files under the templates root (excluding the partials
//! root subtree when one is configured) and separately under the partials
//! root. Both lists are returned in ascending lexicographic path order so
//! every downstream map is deterministic for a given file set.
//!
//! The partials directory is an optional collaborator, represented as an
//! explicit [`Option<PartialsConfig>`] rather than an empty-string sentinel:
//! all partial-triggered logic in the crate branches on its presence.

pub mod name;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::SyncError;

pub use name::{TEMPLATE_EXTENSION, logical_name, template_path};

/// The optional partials collaborator: its root directory and the discovered
/// partial files beneath it.
#[derive(Debug, Clone)]
pub struct PartialsConfig {
    /// Root directory for partials; logical partial names are relative to it.
    pub dir: PathBuf,
    /// Discovered `*.hbs` files, lexicographically sorted.
    pub paths: Vec<PathBuf>,
}

/// The discovered template set for one sync run.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    /// Root directory for templates; logical template names are relative to it.
    pub templates_dir: PathBuf,
    /// Discovered template files, lexicographically sorted. Never contains
    /// files under the partials root.
    pub templates: Vec<PathBuf>,
    /// The partials collaborator, when a partials directory is configured.
    pub partials: Option<PartialsConfig>,
}

impl TemplateSet {
    /// Discover all templates and partials for a sync run.
    ///
    /// `templates_dir` must exist. `partials_dir` may live inside
    /// `templates_dir`; its subtree is excluded from the template list.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConfigError`] if a directory does not exist and
    /// [`SyncError::DiscoveryError`] if enumeration fails partway; no partial
    /// results are returned.
    pub fn discover(
        templates_dir: &Path,
        partials_dir: Option<&Path>,
    ) -> Result<Self, SyncError> {
        if !templates_dir.is_dir() {
            return Err(SyncError::ConfigError {
                message: format!(
                    "templates directory does not exist: {}",
                    templates_dir.display()
                ),
            });
        }
        if let Some(dir) = partials_dir
            && !dir.is_dir()
        {
            return Err(SyncError::ConfigError {
                message: format!("partials directory does not exist: {}", dir.display()),
            });
        }

        let templates_dir = absolutize(templates_dir)?;
        let partials_dir = partials_dir.map(absolutize).transpose()?;

        let templates = find_hbs_files(&templates_dir, partials_dir.as_deref())?;
        let partials = partials_dir
            .map(|dir| {
                let paths = find_hbs_files(&dir, None)?;
                Ok::<_, SyncError>(PartialsConfig {
                    dir,
                    paths,
                })
            })
            .transpose()?;

        Ok(Self {
            templates_dir,
            templates,
            partials,
        })
    }

    /// Logical names of all discovered templates, in discovery order.
    #[must_use]
    pub fn template_names(&self) -> Vec<String> {
        self.templates
            .iter()
            .map(|path| logical_name(&self.templates_dir, path))
            .collect()
    }
}

fn absolutize(path: &Path) -> Result<PathBuf, SyncError> {
    std::path::absolute(path).map_err(|e| SyncError::DiscoveryError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Recursively enumerate `*.hbs` files under `root`, excluding the `exclude`
/// subtree, sorted lexicographically by path.
fn find_hbs_files(root: &Path, exclude: Option<&Path>) -> Result<Vec<PathBuf>, SyncError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| SyncError::DiscoveryError {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;
        let path = entry.path();
        if let Some(excluded) = exclude
            && path.starts_with(excluded)
        {
            continue;
        }
        if entry.file_type().is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}
