//! sendgrid-sync - keep SendGrid dynamic templates in lockstep with a
//! directory of Handlebars sources.
//!
//! Local `.hbs` files are the source of truth. Each sync run discovers the
//! template and partial trees, builds the template-to-partial dependency
//! graph, translates raw file events (from a git comparison or a forced
//! full sync) into a template-level changeset, renders the changed
//! templates with partials inlined, and reconciles the result against the
//! remote inventory - creating, versioning, pruning, renaming and deleting
//! templates as needed.
//!
//! # Architecture
//!
//! Data flows through the modules in order:
//!
//! 1. [`templates`] - enumerate `*.hbs` files and resolve logical names
//! 2. [`graph`] - extract partial references and build the dependency maps
//! 3. [`changeset`] - fold file events and the graph into a [`changeset::Changeset`]
//! 4. [`render`] - produce upload-ready HTML for each changed template
//! 5. [`sync`] - reconcile the changeset against the SendGrid inventory,
//!    rotating version history down to the retention count
//!
//! Supporting modules: [`sendgrid`] (REST client), [`git`] (file events from
//! a commit comparison), [`cli`] (command-line surface), [`core`] (errors).
//!
//! The dependency graph and remote index are rebuilt from scratch on every
//! run; nothing is shared across runs, and a re-run after a partial failure
//! converges because the remote inventory is re-fetched fresh.
//!
//! # Example
//!
//! ```bash
//! SENDGRID_API_KEY=... sendgrid-sync ./templates \
//!     --partials-dir ./templates/partials \
//!     --template-prefix myapp- \
//!     --preserve-versions 2 \
//!     --output template-ids.json
//! ```

pub mod changeset;
pub mod cli;
pub mod core;
pub mod git;
pub mod graph;
pub mod render;
pub mod sendgrid;
pub mod sync;
pub mod templates;

// Available to unit tests and, via the `test-utils` feature, to the
// integration test suite.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
