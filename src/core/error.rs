//! Error handling for fsroute
//!
//! This module provides the error taxonomy of the routing engine and the
//! user-facing wrapper used by the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** so callers can match on resolution failures
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`RouterError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Resolution**: [`RouterError::CircularReference`], [`RouterError::ProviderMismatch`]
//! - **Mixins**: [`RouterError::MixinNotFound`], [`RouterError::MixinCollision`],
//!   [`RouterError::MixinCycle`]
//! - **Parent layer search**: [`RouterError::FinalNotFound`], [`RouterError::UnknownLayer`]
//! - **Artifacts and indexes**: [`RouterError::InvalidArtifact`], [`RouterError::NotInitialized`]
//! - **Configuration and evaluation**: [`RouterError::ConfigError`], [`RouterError::Evaluation`]
//! - **Underlying I/O and parsing**: [`RouterError::Io`], [`RouterError::Json`], [`RouterError::Toml`]
//!
//! None of these are retried internally. "Nothing found" at a single layer is not an
//! error; only [`RouterError::FinalNotFound`] is used as a designed control-flow signal
//! by the parent layer search, which checks for it with [`RouterError::is_final_not_found`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use fsroute::core::{RouterError, user_friendly_error};
//!
//! let error = RouterError::MixinNotFound {
//!     mixin: "shared".to_string(),
//!     provider: "x/t@app".to_string(),
//!     directory: "/srv/app".to_string(),
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// The main error type for routing operations
///
/// Every failure surfaced by [`crate::router::Router::init`] and
/// [`crate::router::Router::render`] is one of these variants. Each variant carries
/// the identifiers needed to locate the offending artifact on disk.
#[derive(Error, Debug)]
pub enum RouterError {
    /// A URL was visited twice while following `parent` links
    ///
    /// `visited` holds every normalized URL visited so far with its visit order,
    /// sorted by that order. The message renders it as `{"url":order,...}`.
    #[error(
        "Circle with value '{url}' encountered while resolving the providers: {}",
        visit_map_json(visited)
    )]
    CircularReference {
        /// The URL that was requested a second time
        url: String,
        /// Visited URLs and their visit order
        visited: Vec<(String, usize)>,
    },

    /// Same-depth matches from different layers declare different parents
    #[error("The providers for '{url}' do not have the same parent. Provider list: {}", providers.join(", "))]
    ProviderMismatch {
        /// The URL being resolved
        url: String,
        /// Ids of every provider that took part in the tie
        providers: Vec<String>,
    },

    /// A declared mixin has no exact artifact in the owning layer
    #[error("Mixin '{mixin}' for provider '{provider}' in directory '{directory}' not found.")]
    MixinNotFound {
        /// The mixin URL as declared
        mixin: String,
        /// Id of the provider declaring the mixin
        provider: String,
        /// Base directory of the owning layer
        directory: String,
    },

    /// A mixin field already exists on the target provider
    #[error(
        "Mixin property '{field}' from '{mixin}' in directory '{directory}' can not be inserted into '{provider}'."
    )]
    MixinCollision {
        /// The colliding field name
        field: String,
        /// The mixin URL contributing the field
        mixin: String,
        /// Base directory of the owning layer
        directory: String,
        /// Id of the target provider
        provider: String,
    },

    /// A mixin (directly or transitively) includes itself
    #[error("Mixin cycle while merging into '{provider}': {}", chain.join(" -> "))]
    MixinCycle {
        /// Id of the target provider
        provider: String,
        /// Mixin URLs from the outermost to the repeated one
        chain: Vec<String>,
    },

    /// No remaining layer can provide the requested artifact
    #[error("No provider found for '{id}'")]
    FinalNotFound {
        /// The provider id that was searched for
        id: String,
    },

    /// A provider id names a layer that is not configured for its kind
    #[error("Layer '{layer}' is not configured for {kind} providers")]
    UnknownLayer {
        /// The unknown layer id
        layer: String,
        /// Artifact kind ("template" or "context")
        kind: String,
    },

    /// A precomputed index was queried before `init()` built it
    #[error("Index for layer '{layer}' has not been built; call init() before render()")]
    NotInitialized {
        /// Layer id of the unbuilt index
        layer: String,
    },

    /// An artifact file was found but does not have the expected shape
    #[error("Invalid artifact '{path}': {reason}")]
    InvalidArtifact {
        /// Path of the artifact file
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Router configuration is inconsistent
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// The evaluator failed to produce output for a resolved chain
    #[error("Evaluation failed: {message}")]
    Evaluation {
        /// Description of the evaluation failure
        message: String,
    },

    /// Filesystem error other than "does not exist"
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON artifact could not be parsed
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML artifact could not be parsed
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Renders visited URLs as a JSON object in visit order, e.g. `{"a":0,"b":1}`.
pub fn visit_map_json(visited: &[(String, usize)]) -> String {
    let entries: Vec<String> = visited
        .iter()
        .map(|(url, position)| format!("{}:{position}", Value::String(url.clone())))
        .collect();
    format!("{{{}}}", entries.join(","))
}

impl RouterError {
    /// Returns `true` for the parent layer search's "nothing further" signal.
    #[must_use]
    pub const fn is_final_not_found(&self) -> bool {
        matches!(self, Self::FinalNotFound { .. })
    }
}

impl Clone for RouterError {
    fn clone(&self) -> Self {
        match self {
            Self::CircularReference {
                url,
                visited,
            } => Self::CircularReference {
                url: url.clone(),
                visited: visited.clone(),
            },
            Self::ProviderMismatch {
                url,
                providers,
            } => Self::ProviderMismatch {
                url: url.clone(),
                providers: providers.clone(),
            },
            Self::MixinNotFound {
                mixin,
                provider,
                directory,
            } => Self::MixinNotFound {
                mixin: mixin.clone(),
                provider: provider.clone(),
                directory: directory.clone(),
            },
            Self::MixinCollision {
                field,
                mixin,
                directory,
                provider,
            } => Self::MixinCollision {
                field: field.clone(),
                mixin: mixin.clone(),
                directory: directory.clone(),
                provider: provider.clone(),
            },
            Self::MixinCycle {
                provider,
                chain,
            } => Self::MixinCycle {
                provider: provider.clone(),
                chain: chain.clone(),
            },
            Self::FinalNotFound {
                id,
            } => Self::FinalNotFound {
                id: id.clone(),
            },
            Self::UnknownLayer {
                layer,
                kind,
            } => Self::UnknownLayer {
                layer: layer.clone(),
                kind: kind.clone(),
            },
            Self::NotInitialized {
                layer,
            } => Self::NotInitialized {
                layer: layer.clone(),
            },
            Self::InvalidArtifact {
                path,
                reason,
            } => Self::InvalidArtifact {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::Evaluation {
                message,
            } => Self::Evaluation {
                message: message.clone(),
            },
            // io::Error is not Clone; keep kind and message
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::Json(e) => Self::Evaluation {
                message: format!("JSON parsing error: {e}"),
            },
            Self::Toml(e) => Self::Evaluation {
                message: format!("TOML parsing error: {e}"),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
///
/// ```rust,no_run
/// use fsroute::core::{RouterError, ErrorContext};
///
/// let context = ErrorContext::new(RouterError::NotInitialized { layer: "app".into() })
///     .with_suggestion("Call init() once after constructing the router");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying routing error
    pub error: RouterError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: RouterError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`RouterError`] (anywhere in the `anyhow` chain) and bare
/// [`std::io::Error`]s; everything else is wrapped with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(router_error) = error.chain().find_map(|e| e.downcast_ref::<RouterError>()) {
        return create_error_context(router_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(RouterError::Io(std::io::Error::new(
                io_error.kind(),
                io_error.to_string(),
            )))
            .with_suggestion("Check the permissions of the layer directories and artifact files")
            .with_details("fsroute needs read access to every configured layer directory");
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(RouterError::Evaluation {
        message,
    })
}

/// Map each [`RouterError`] variant to suggestions and details.
fn create_error_context(error: RouterError) -> ErrorContext {
    match &error {
        RouterError::CircularReference {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Remove one of the 'parent' links so the chain terminates")
            .with_details("Each URL may appear at most once while following 'parent' links"),

        RouterError::ProviderMismatch {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Give every same-depth artifact of this URL the same 'parent' value")
            .with_details(
                "Artifacts at the same path in different layers are chained together and must agree on their parent",
            ),

        RouterError::MixinNotFound {
            mixin,
            directory,
            ..
        } => {
            let details = format!(
                "Mixins are looked up by exact path inside the declaring layer only; '{mixin}' has no artifact under '{directory}'"
            );
            ErrorContext::new(error)
                .with_suggestion("Create the mixin artifact in the same layer or fix the mixin path")
                .with_details(details)
        }

        RouterError::MixinCollision {
            field,
            ..
        } => {
            let suggestion = format!("Rename or remove one of the '{field}' definitions");
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Mixins never overwrite fields that already exist on the provider")
        }

        RouterError::MixinCycle {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Break the cycle in the 'mixin' lists"),

        RouterError::NotInitialized {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Call init() once after constructing the router, or enable hot_update"),

        RouterError::InvalidArtifact {
            ..
        } => ErrorContext::new(error)
            .with_suggestion(
                "Artifacts must be JSON objects, or TOML documents with a [default] table; 'parent' is a string and 'mixin' a list of strings",
            ),

        RouterError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the layer lists in your fsroute.toml"),

        RouterError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => ErrorContext::new(error)
            .with_suggestion("Check the permissions of the layer directories and artifact files"),

        _ => ErrorContext::new(error),
    }
}
