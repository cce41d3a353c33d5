//! Error handling for sendgrid-sync.
//!
//! The error system is built around two types:
//! - [`SyncError`] - strongly-typed failure cases for every stage of a sync run
//! - [`ErrorContext`] - wrapper adding a user-facing suggestion and details
//!
//! Operational code returns [`anyhow::Result`] and attaches context with
//! [`anyhow::Context`]; the CLI entry point converts whatever bubbles up into
//! an [`ErrorContext`] via [`user_friendly_error`] before exiting non-zero.
//!
//! # Error Categories
//!
//! - **Configuration**: [`SyncError::ConfigError`], [`SyncError::ApiKeyMissing`] -
//!   fatal, reported before any remote call
//! - **Discovery**: [`SyncError::DiscoveryError`] - filesystem enumeration failures
//! - **Parsing**: [`SyncError::TemplateParseError`], [`SyncError::RenderError`] -
//!   a malformed template aborts the whole run
//! - **Remote API**: [`SyncError::ApiError`], [`SyncError::NetworkError`] -
//!   not retried; any failure in a concurrent batch aborts the run
//! - **Targets**: [`SyncError::TargetNotFound`] - fatal before remote mutation
//! - **Git**: [`SyncError::GitCommandError`] - history-diff collaborator failures

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for sync operations.
///
/// Each variant represents a specific failure mode with enough context to
/// produce an actionable message. Configuration and target errors are always
/// raised before the first remote call; remote errors abort the run without
/// retrying (re-running converges because the remote inventory is re-fetched
/// fresh each time).
#[derive(Error, Debug)]
pub enum SyncError {
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// No SendGrid API key was provided
    #[error("SendGrid API key is required")]
    ApiKeyMissing,

    /// Template or partial discovery failed
    #[error("Failed to discover templates under {path}")]
    DiscoveryError {
        /// Directory that was being enumerated
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// A template failed to parse during dependency extraction
    #[error("Failed to parse template {file}")]
    TemplateParseError {
        /// Path of the template that failed to parse
        file: String,
        /// Parser error message
        reason: String,
    },

    /// A template failed to render
    #[error("Failed to render template '{name}'")]
    RenderError {
        /// Logical name of the template that failed to render
        name: String,
        /// Renderer error message
        reason: String,
    },

    /// The SendGrid API returned a non-success status
    #[error("SendGrid API error during {operation}: HTTP {status}")]
    ApiError {
        /// The API operation that failed (e.g. "create template")
        operation: String,
        /// HTTP status code returned by the API
        status: u16,
        /// Response body, if any
        body: String,
    },

    /// A network-level failure reaching the SendGrid API
    #[error("Network error during {operation}")]
    NetworkError {
        /// The operation that failed
        operation: String,
        /// Reason for the failure
        reason: String,
    },

    /// A `--target` name did not match any discovered template
    #[error("Cannot find template: {name}")]
    TargetNotFound {
        /// The target name that was not found
        name: String,
    },

    /// Git command execution failed
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g. "diff")
        operation: String,
        /// Error output from the git command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Rich error context for user-friendly CLI display.
///
/// Wraps a [`SyncError`] with an optional suggestion (displayed in green) and
/// optional details (displayed in yellow).
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying sync error
    pub error: SyncError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a [`SyncError`].
    #[must_use]
    pub const fn new(error: SyncError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display this error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{} {}", " Error: ".on_red().white(), self.error.to_string().red());

        if let Some(ref details) = self.details {
            eprintln!("  {}", details.yellow());
        }

        if let Some(ref suggestion) = self.suggestion {
            eprintln!("  {} {}", "Hint:".green().bold(), suggestion.green());
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(ref details) = self.details {
            write!(f, "\n  {details}")?;
        }
        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  Hint: {suggestion}")?;
        }
        Ok(())
    }
}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Recognizes [`SyncError`] variants and attaches tailored suggestions;
/// everything else is passed through with generic formatting.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    match error.downcast::<SyncError>() {
        Ok(sync_error) => {
            let suggestion = match &sync_error {
                SyncError::ApiKeyMissing => Some(
                    "Set the SENDGRID_API_KEY environment variable or use the --api-key flag"
                        .to_string(),
                ),
                SyncError::ConfigError { .. } => {
                    Some("Run with --help to see the expected arguments".to_string())
                }
                SyncError::TargetNotFound { .. } => Some(
                    "Target names are logical template names without the .hbs extension, \
                     relative to the templates directory"
                        .to_string(),
                ),
                SyncError::ApiError { status: 401 | 403, .. } => {
                    Some("Check that the SendGrid API key is valid and has template scopes".to_string())
                }
                SyncError::GitCommandError { .. } => {
                    Some("Make sure the command runs inside a git repository and the refs exist".to_string())
                }
                SyncError::TemplateParseError { .. } => {
                    Some("Fix the Handlebars syntax error reported above and re-run".to_string())
                }
                _ => None,
            };

            let mut context = ErrorContext::new(sync_error);
            if let Some(suggestion) = suggestion {
                context = context.with_suggestion(suggestion);
            }
            context
        }
        Err(other) => {
            let details = other
                .chain()
                .skip(1)
                .map(|cause| cause.to_string())
                .collect::<Vec<_>>()
                .join(": ");
            let mut context = ErrorContext::new(SyncError::Other {
                message: other.to_string(),
            });
            if !details.is_empty() {
                context = context.with_details(details);
            }
            context
        }
    }
}
