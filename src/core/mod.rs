//! Core types shared across the crate.
//!
//! Currently this is the error system: the [`SyncError`] taxonomy, the
//! [`ErrorContext`] display wrapper, and [`user_friendly_error`] used by the
//! CLI entry point.

pub mod error;

pub use error::{ErrorContext, SyncError, user_friendly_error};
