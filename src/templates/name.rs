//! Logical name resolution for templates and partials.
//!
//! A logical name identifies a template independently of its filesystem
//! location or remote storage: it is the path relative to its root directory
//! with the `.hbs` extension stripped and separators normalized to `/`.
//! Two files with the same logical name under different roots (templates vs
//! partials) are distinct entities.

use std::path::{Path, PathBuf};

/// File extension recognized for templates and partials.
pub const TEMPLATE_EXTENSION: &str = "hbs";

/// Resolve a file path to its logical name relative to `root`.
///
/// The result is the relative path with `.hbs` stripped and components joined
/// with `/` on every platform, so `templates/nested/welcome.hbs` under
/// `templates` resolves to `nested/welcome`.
///
/// Paths outside `root` are resolved against their final components only;
/// discovery guarantees this never happens for enumerated files.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sendgrid_sync::templates::name::logical_name;
///
/// let root = Path::new("/work/templates");
/// assert_eq!(logical_name(root, Path::new("/work/templates/welcome.hbs")), "welcome");
/// assert_eq!(
///     logical_name(root, Path::new("/work/templates/nested/welcome.hbs")),
///     "nested/welcome"
/// );
/// ```
#[must_use]
pub fn logical_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    match joined.strip_suffix(&format!(".{TEMPLATE_EXTENSION}")) {
        Some(stripped) => stripped.to_string(),
        None => joined,
    }
}

/// Reconstruct the file path for a logical name under `root`.
///
/// Inverse of [`logical_name`]: `template_path(root, logical_name(root, p))`
/// recovers a path equivalent to `p`.
#[must_use]
pub fn template_path(root: &Path, name: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    let mut parts = name.split('/').peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_some() {
            path.push(part);
        } else {
            path.push(format!("{part}.{TEMPLATE_EXTENSION}"));
        }
    }
    path
}
