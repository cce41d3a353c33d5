//! Remote reconciliation against the SendGrid template inventory.
//!
//! Takes a [`Changeset`] plus freshly rendered content per changed template
//! and converges the remote state: creates missing templates, applies
//! renames, pushes new versions, prunes version history beyond the retention
//! count, and deletes removed templates.
//!
//! Phases run strictly in order (create/rename, then version-bump, then
//! prune, then template-delete) because later phases read the in-memory
//! index mutated by earlier ones. Within a phase all remote calls are issued
//! as one concurrent batch; a single failure fails the batch and aborts the
//! run. Re-running after a partial failure converges because the inventory is
//! re-fetched fresh on every run.
//!
//! Dry-run mode executes the identical control flow with synthesized
//! placeholder ids and no remote calls beyond the initial inventory fetch, so
//! the returned mapping has the same shape as a live run.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use futures::future::try_join_all;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::changeset::{Changeset, RenamedName};
use crate::core::SyncError;
use crate::sendgrid::{NewTemplateVersion, SendGridClient, Template, TemplateVersion};

/// Version labels follow `v<N>`; anything else is ignored for numbering.
static VERSION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v(\d+)$").expect("version pattern is valid"));

/// Reconciliation options.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Prefix prepended to remote template names and stripped when indexing.
    pub template_prefix: String,
    /// Default subject line for new versions.
    pub subject_template: String,
    /// Per-template subject overrides, keyed by logical name.
    pub subject_overrides: BTreeMap<String, String>,
    /// Number of most-recent versions retained per template after a sync.
    /// Always at least 1.
    pub preserve_versions: usize,
    /// Simulate without mutating remote state.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            template_prefix: String::new(),
            subject_template: "{{subject}}".to_string(),
            subject_overrides: BTreeMap::new(),
            preserve_versions: 2,
            dry_run: false,
        }
    }
}

/// The remote operations derived from a changeset and the current inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Names to create remotely (created or updated but missing remotely).
    pub to_create: Vec<String>,
    /// Renames whose `from` side exists remotely; others are dropped.
    pub to_rename: Vec<RenamedName>,
    /// Names that receive a fresh version: everything in `to_create` plus
    /// updated names that already exist remotely.
    pub to_version_bump: Vec<String>,
    /// Deleted names that exist remotely.
    pub to_delete: Vec<String>,
}

impl SyncPlan {
    /// Derive the plan from a changeset and the set of de-prefixed names
    /// currently present remotely.
    #[must_use]
    pub fn build(changeset: &Changeset, existing: &HashSet<String>) -> Self {
        let to_create: Vec<String> = changeset
            .created
            .iter()
            .chain(changeset.updated.iter())
            .filter(|name| !existing.contains(*name))
            .cloned()
            .collect();

        let to_rename: Vec<RenamedName> = changeset
            .renamed
            .iter()
            .filter(|pair| {
                let known = existing.contains(&pair.from);
                if !known {
                    debug!("Dropping rename of unknown remote template: {}", pair.from);
                }
                known
            })
            .cloned()
            .collect();

        let to_version_bump: Vec<String> = to_create
            .iter()
            .cloned()
            .chain(changeset.updated.iter().filter(|name| existing.contains(*name)).cloned())
            .collect();

        let to_delete: Vec<String> =
            changeset.deleted.iter().filter(|name| existing.contains(*name)).cloned().collect();

        Self {
            to_create,
            to_rename,
            to_version_bump,
            to_delete,
        }
    }
}

/// Reconcile a changeset against the live remote inventory.
///
/// Returns the final mapping from logical template name to remote id,
/// excluding templates deleted by this run.
pub async fn sync(
    client: &SendGridClient,
    changeset: &Changeset,
    rendered: &HashMap<String, String>,
    options: &SyncOptions,
) -> Result<BTreeMap<String, String>, SyncError> {
    let inventory = client.list_templates().await?;
    sync_with_inventory(client, changeset, rendered, inventory, options).await
}

/// Reconcile against an already-fetched inventory.
///
/// Split out from [`sync`] so the full phase logic, including dry-run, can be
/// exercised without a remote endpoint.
pub async fn sync_with_inventory(
    client: &SendGridClient,
    changeset: &Changeset,
    rendered: &HashMap<String, String>,
    inventory: Vec<Template>,
    options: &SyncOptions,
) -> Result<BTreeMap<String, String>, SyncError> {
    let prefix = options.template_prefix.as_str();
    let strip = |name: &str| name.strip_prefix(prefix).unwrap_or(name).to_string();

    // Transient index keyed by de-prefixed name, held for this run only.
    let mut index: BTreeMap<String, Template> = inventory
        .into_iter()
        .filter(|t| t.name.starts_with(prefix))
        .map(|t| (strip(&t.name), t))
        .collect();
    let existing: HashSet<String> = index.keys().cloned().collect();

    let plan = SyncPlan::build(changeset, &existing);

    // Phase 1: create missing templates and apply renames concurrently.
    if !plan.to_create.is_empty() {
        log(options.dry_run, "Creating templates:");
    }
    let created = try_join_all(plan.to_create.iter().enumerate().map(|(i, name)| {
        let prefixed = format!("{prefix}{name}");
        async move {
            log(options.dry_run, &format!("  - Creating {prefixed}"));
            if options.dry_run {
                Ok(placeholder_template("create", &prefixed, i))
            } else {
                client.create_template(&prefixed).await
            }
        }
    }))
    .await?;

    if !plan.to_rename.is_empty() {
        log(options.dry_run, "Renaming templates:");
    }
    let renamed = try_join_all(plan.to_rename.iter().enumerate().map(|(i, pair)| {
        let from_prefixed = format!("{prefix}{}", pair.from);
        let to_prefixed = format!("{prefix}{}", pair.to);
        let target_id = index.get(&pair.from).map(|t| t.id.clone());
        async move {
            log(
                options.dry_run,
                &format!("  - Renaming template: {from_prefixed} -> {to_prefixed}"),
            );
            if options.dry_run {
                Ok(placeholder_template("rename", &to_prefixed, i))
            } else {
                // Plan membership guarantees the target exists in the index.
                let id = target_id.ok_or_else(|| SyncError::Other {
                    message: format!("rename target missing from index: {}", pair.from),
                })?;
                client.rename_template(&id, &to_prefixed).await
            }
        }
    }))
    .await?;

    for template in created.into_iter().chain(renamed) {
        index.insert(strip(&template.name), template);
    }
    for pair in &plan.to_rename {
        index.remove(&pair.from);
    }

    // Phase 2: push a fresh version for every created or updated template.
    if !plan.to_version_bump.is_empty() {
        log(options.dry_run, "Creating new template versions:");
    }
    try_join_all(plan.to_version_bump.iter().map(|name| {
        let template = index.get(name);
        async move {
            let Some(template) = template else {
                warn!("Skipping version bump for unindexed template: {name}");
                return Ok(());
            };
            let next = next_version(&template.versions);
            log(
                options.dry_run,
                &format!("  - Creating new version for template: {} ({next})", template.name),
            );
            if options.dry_run {
                return Ok(());
            }
            let subject = options
                .subject_overrides
                .get(name)
                .unwrap_or(&options.subject_template)
                .clone();
            let version = NewTemplateVersion {
                name: next,
                subject,
                active: 1,
                html_content: rendered.get(name).cloned().unwrap_or_default(),
                plain_content: String::new(),
            };
            client.create_version(&template.id, &version).await.map(|_| ())
        }
    }))
    .await?;

    // Phase 3: prune version history beyond the retention count. The index
    // still holds the pre-bump version lists, so retention accounts for the
    // version just created.
    let prune: Vec<(&Template, Vec<&TemplateVersion>)> = plan
        .to_version_bump
        .iter()
        .filter_map(|name| index.get(name))
        .map(|t| (t, outdated_versions(&t.versions, options.preserve_versions)))
        .filter(|(_, outdated)| !outdated.is_empty())
        .collect();
    if !prune.is_empty() {
        log(options.dry_run, "Deleting old template versions:");
    }
    try_join_all(prune.iter().flat_map(|(template, outdated)| {
        outdated.iter().map(move |version| async move {
            log(
                options.dry_run,
                &format!("  - Deleting old version: {} ({})", template.name, version.name),
            );
            if options.dry_run {
                return Ok(());
            }
            client.delete_version(&template.id, &version.id).await
        })
    }))
    .await?;

    // Phase 4: delete removed templates.
    try_join_all(plan.to_delete.iter().map(|name| {
        let template = index.get(name);
        async move {
            log(options.dry_run, &format!("Deleting template: {name}"));
            match template {
                Some(template) if !options.dry_run => client.delete_template(&template.id).await,
                _ => Ok(()),
            }
        }
    }))
    .await?;

    let deleted: HashSet<&String> = plan.to_delete.iter().collect();
    let mapping = index
        .iter()
        .filter(|(name, _)| !deleted.contains(name))
        .map(|(name, template)| (name.clone(), template.id.clone()))
        .collect();

    info!("Synced {} template(s)", plan.to_version_bump.len());
    Ok(mapping)
}

/// Compute the next version label from the existing version history.
///
/// The lexicographically-last label matching `v<digits>` determines the next
/// number; anything else (including an empty history) falls back to `v1`.
#[must_use]
pub fn next_version(versions: &[TemplateVersion]) -> String {
    let mut names: Vec<&str> = versions.iter().map(|v| v.name.as_str()).collect();
    names.sort_unstable();

    names
        .last()
        .and_then(|last| VERSION_LABEL.captures(last))
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map_or_else(|| "v1".to_string(), |n| format!("v{}", n + 1))
}

/// Versions to delete so that only the `preserve` most recent remain once the
/// new version (not yet in `versions`) is counted.
#[must_use]
pub fn outdated_versions(versions: &[TemplateVersion], preserve: usize) -> Vec<&TemplateVersion> {
    let mut sorted: Vec<&TemplateVersion> = versions.iter().collect();
    sorted.sort_unstable_by(|a, b| a.name.cmp(&b.name));

    let delete_count = (sorted.len() + 1).saturating_sub(preserve).min(sorted.len());
    sorted.truncate(delete_count);
    sorted
}

fn placeholder_template(operation: &str, prefixed_name: &str, index: usize) -> Template {
    Template {
        id: format!("sendgrid-dummy-id-{operation}-{prefixed_name}-{}", index + 1),
        name: prefixed_name.to_string(),
        generation: crate::sendgrid::models::TEMPLATE_GENERATION.to_string(),
        versions: Vec::new(),
    }
}

fn log(dry_run: bool, message: &str) {
    if dry_run {
        info!("[dry-run] {message}");
    } else {
        info!("{message}");
    }
}
