//! History-diff collaborator.
//!
//! Derives the [`FileEvents`] for a sync run from a commit comparison by
//! shelling out to the system `git` binary, the same way a CI trigger would
//! compare the pushed range. Only `.hbs` paths survive the filter; statuses
//! are classified into added/modified/deleted/renamed per file.

use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::changeset::{FileEvents, RenamedFile};
use crate::core::SyncError;
use crate::templates::TEMPLATE_EXTENSION;

/// Compute file events between two refs with `git diff --name-status -M`.
///
/// Paths in the result are absolute, joined onto `repo_dir`. Rename detection
/// is delegated to git's similarity scoring.
///
/// # Errors
///
/// Fails with [`SyncError::GitCommandError`] when git exits non-zero (unknown
/// refs, not a repository) and with [`SyncError::IoError`] when the binary
/// cannot be spawned.
pub async fn diff_events(repo_dir: &Path, base: &str, head: &str) -> Result<FileEvents, SyncError> {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(["diff", "--name-status", "-M", base, head])
        .output()
        .await?;

    if !output.status.success() {
        return Err(SyncError::GitCommandError {
            operation: format!("diff {base}..{head}"),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let events = parse_name_status(&stdout, repo_dir);
    debug!(
        "git diff {base}..{head}: {} added, {} modified, {} deleted, {} renamed",
        events.added.len(),
        events.modified.len(),
        events.deleted.len(),
        events.renamed.len()
    );
    Ok(events)
}

/// Parse `git diff --name-status` output into file events, keeping only
/// `.hbs` paths. Unrecognized statuses are ignored.
#[must_use]
pub fn parse_name_status(output: &str, repo_dir: &Path) -> FileEvents {
    let is_hbs =
        |path: &str| Path::new(path).extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXTENSION);

    let mut events = FileEvents::default();
    for line in output.lines() {
        let mut fields = line.split('\t');
        let Some(status) = fields.next() else {
            continue;
        };
        match (status.chars().next(), fields.next(), fields.next()) {
            (Some('A'), Some(path), _) if is_hbs(path) => {
                events.added.push(repo_dir.join(path));
            }
            (Some('M'), Some(path), _) if is_hbs(path) => {
                events.modified.push(repo_dir.join(path));
            }
            (Some('D'), Some(path), _) if is_hbs(path) => {
                events.deleted.push(repo_dir.join(path));
            }
            (Some('R'), Some(from), Some(to)) if is_hbs(to) => {
                events.renamed.push(RenamedFile {
                    from: repo_dir.join(from),
                    to: repo_dir.join(to),
                });
            }
            _ => {}
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_classifies_statuses() {
        let repo = Path::new("/repo");
        let output = "A\ttemplates/new.hbs\n\
                      M\ttemplates/changed.hbs\n\
                      D\ttemplates/gone.hbs\n\
                      R100\ttemplates/old.hbs\ttemplates/renamed.hbs\n";

        let events = parse_name_status(output, repo);
        assert_eq!(events.added, vec![PathBuf::from("/repo/templates/new.hbs")]);
        assert_eq!(events.modified, vec![PathBuf::from("/repo/templates/changed.hbs")]);
        assert_eq!(events.deleted, vec![PathBuf::from("/repo/templates/gone.hbs")]);
        assert_eq!(
            events.renamed,
            vec![RenamedFile {
                from: PathBuf::from("/repo/templates/old.hbs"),
                to: PathBuf::from("/repo/templates/renamed.hbs"),
            }]
        );
    }

    #[test]
    fn test_parse_filters_non_hbs_paths() {
        let repo = Path::new("/repo");
        let output = "A\tREADME.md\nM\tsrc/main.ts\nD\ttemplates/kept.hbs\n";

        let events = parse_name_status(output, repo);
        assert!(events.added.is_empty());
        assert!(events.modified.is_empty());
        assert_eq!(events.deleted.len(), 1);
    }

    #[test]
    fn test_parse_partial_rename_scores() {
        let repo = Path::new("/repo");
        let output = "R087\ttemplates/a.hbs\ttemplates/b.hbs\n";

        let events = parse_name_status(output, repo);
        assert_eq!(events.renamed.len(), 1);
    }

    #[test]
    fn test_parse_ignores_unknown_and_blank_lines() {
        let repo = Path::new("/repo");
        let output = "\nT\ttemplates/typechange.hbs\nU\ttemplates/unmerged.hbs\n";

        let events = parse_name_status(output, repo);
        assert_eq!(events, FileEvents::default());
    }
}
