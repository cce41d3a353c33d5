//! Command-line interface for sendgrid-sync.
//!
//! A single-command CLI: point it at a templates directory (and optionally a
//! partials directory) and it reconciles the SendGrid account against the
//! local files. Without `--base-ref` every discovered template (or the
//! `--target` subset) is force-synced as modified; with `--base-ref` the
//! events come from a git commit comparison, which is how CI pushes drive
//! incremental syncs.
//!
//! # Examples
//!
//! ```bash
//! # Force-sync everything, previewing the operations first
//! SENDGRID_API_KEY=... sendgrid-sync ./templates -p ./templates/partials --dry-run
//!
//! # Sync only what changed since the last deployed commit
//! sendgrid-sync ./templates -p ./templates/partials --base-ref "$LAST_DEPLOY_SHA"
//!
//! # Restrict to specific templates and save the id mapping
//! sendgrid-sync ./templates -t welcome -t account/reset -o template-ids.json
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use futures::future::try_join_all;
use tracing_subscriber::EnvFilter;

use crate::changeset::{ChangesetGenerator, FileEvents};
use crate::core::SyncError;
use crate::git;
use crate::graph::DependencyMaps;
use crate::render::Renderer;
use crate::sendgrid::SendGridClient;
use crate::sync::{SyncOptions, sync};
use crate::templates::{TemplateSet, template_path};

/// Runtime configuration derived from the CLI flags.
///
/// Kept separate from the parsed arguments so tests can inject a
/// configuration without going through flag parsing.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level filter; `None` suppresses all log output.
    pub log_level: Option<String>,
}

impl CliConfig {
    /// Build the tracing filter for this configuration. An explicit
    /// `RUST_LOG` always wins over the flag-derived level.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        match &self.log_level {
            Some(level) => {
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
            }
            None => EnvFilter::new("off"),
        }
    }
}

/// Sync Handlebars email templates with SendGrid dynamic templates.
#[derive(Parser, Debug)]
#[command(
    name = "sendgrid-sync",
    about = "Sync Handlebars email templates with SendGrid dynamic templates",
    version
)]
pub struct Cli {
    /// Path to the templates directory.
    pub templates_dir: PathBuf,

    /// Path to the partials directory. May live inside the templates
    /// directory; its subtree is excluded from template discovery.
    #[arg(short = 'p', long)]
    pub partials_dir: Option<PathBuf>,

    /// SendGrid API key. Prefer the environment variable over the flag so
    /// the key never lands in shell history.
    #[arg(short = 'a', long, env = "SENDGRID_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Prefix prepended to remote template names.
    #[arg(long, default_value = "")]
    pub template_prefix: String,

    /// Default subject line for new template versions.
    #[arg(long, default_value = "{{subject}}")]
    pub subject_template: String,

    /// Restrict the sync to these template names (logical names without the
    /// .hbs extension). Repeatable.
    #[arg(short = 't', long = "target")]
    pub targets: Vec<String>,

    /// Number of versions to preserve per template.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
    pub preserve_versions: u32,

    /// Simulate the sync without touching remote state.
    #[arg(long)]
    pub dry_run: bool,

    /// Write the final template-name to remote-id mapping to this file as JSON.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Derive file events from `git diff <base-ref> <head-ref>` instead of
    /// force-syncing everything.
    #[arg(long)]
    pub base_ref: Option<String>,

    /// Head ref for the git comparison.
    #[arg(long, default_value = "HEAD")]
    pub head_ref: String,

    /// Enable verbose (debug-level) log output.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Derive the runtime configuration from the verbosity flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };
        CliConfig {
            log_level,
        }
    }

    /// Execute the sync run.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(config.env_filter())
            .with_target(false)
            .try_init();

        if !self.quiet {
            self.print_banner();
        }
        self.run().await
    }

    async fn run(self) -> Result<()> {
        let api_key = self.api_key.clone().ok_or(SyncError::ApiKeyMissing)?;

        let set = TemplateSet::discover(&self.templates_dir, self.partials_dir.as_deref())?;
        let maps = DependencyMaps::build(&set.templates_dir, &set.templates).await?;
        let renderer = Renderer::new(&set.templates_dir, set.partials.as_ref()).await?;
        let generator = ChangesetGenerator::from_discovery(&set, &maps);

        let events = self.collect_events(&set).await?;
        let changes = generator.generate(&events);

        // Render every template that will be pushed, before any remote call.
        let changed: Vec<&String> = changes.created.iter().chain(changes.updated.iter()).collect();
        let rendered: HashMap<String, String> = try_join_all(changed.iter().map(|name| {
            let renderer = &renderer;
            async move { renderer.render(name).await.map(|html| ((*name).clone(), html)) }
        }))
        .await?
        .into_iter()
        .collect();

        let client = SendGridClient::new(api_key)?;
        let options = SyncOptions {
            template_prefix: self.template_prefix.clone(),
            subject_template: self.subject_template.clone(),
            preserve_versions: self.preserve_versions as usize,
            dry_run: self.dry_run,
            ..Default::default()
        };

        let mapping = sync(&client, &changes, &rendered, &options).await?;

        if let Some(ref output) = self.output {
            let json = serde_json::to_string_pretty(&mapping).map_err(SyncError::from)?;
            std::fs::write(output, json)
                .with_context(|| format!("Failed to write id mapping to {}", output.display()))?;
        }

        if !self.quiet {
            let prefix = if self.dry_run {
                "[DRY RUN] ".cyan().to_string()
            } else {
                String::new()
            };
            println!("{prefix}{}", "SendGrid sync completed.".bright_green());
        }
        Ok(())
    }

    /// Compute the file events for this run: a git comparison when
    /// `--base-ref` is given, otherwise a force-sync of all (or the
    /// targeted) templates as modified.
    async fn collect_events(&self, set: &TemplateSet) -> Result<FileEvents, SyncError> {
        if let Some(ref base) = self.base_ref {
            let cwd = std::env::current_dir()?;
            return git::diff_events(&cwd, base, &self.head_ref).await;
        }

        let modified = if self.targets.is_empty() {
            set.templates.clone()
        } else {
            let mut paths = Vec::with_capacity(self.targets.len());
            for target in &self.targets {
                let path = template_path(&set.templates_dir, target);
                if !set.templates.contains(&path) {
                    return Err(SyncError::TargetNotFound {
                        name: target.clone(),
                    });
                }
                paths.push(path);
            }
            paths
        };

        Ok(FileEvents {
            modified,
            ..Default::default()
        })
    }

    fn print_banner(&self) {
        let partials = self
            .partials_dir
            .as_ref()
            .map_or_else(|| "-".to_string(), |p| p.display().to_string());
        let targets = if self.targets.is_empty() {
            "ALL".to_string()
        } else {
            self.targets.join(", ")
        };
        let output = self
            .output
            .as_ref()
            .map_or_else(|| "No output".to_string(), |p| p.display().to_string());

        println!("{} {}", "Templates Directory :".yellow(), self.templates_dir.display());
        println!("{} {partials}", "Partials Directory  :".yellow());
        println!("{} {}", "Template Prefix     :".yellow(), self.template_prefix);
        println!("{} {targets}", "Target Templates    :".yellow());
        println!("{} {}", "Subject Template    :".yellow(), self.subject_template);
        println!("{} {}", "Preserve Versions   :".yellow(), self.preserve_versions);
        println!("{} {}", "Dry Run             :".yellow(), self.dry_run);
        println!("{} {output}", "Output File         :".yellow());
        println!();
    }
}
