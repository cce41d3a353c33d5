//! Integration test suite.
//!
//! Runs the compiled `sendgrid-sync` binary against fixture template trees
//! and a local mock SendGrid server; no external network access.

mod cli_sync;
mod mock_sendgrid;
