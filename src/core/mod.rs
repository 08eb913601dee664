//! Core types for fsroute
//!
//! This module provides the types shared by every layer of the routing engine:
//!
//! ## Error Management
//! - [`RouterError`] - Enumerated error types covering all routing failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//!
//! ## Artifacts and Providers
//! - [`ArtifactKind`] - The template and context namespaces
//! - [`ArtifactForm`] - Plain (`.json`) and module (`.toml`) artifact files
//! - [`Artifact`] - A loaded artifact file before resolution
//! - [`Provider`] - A resolved node of a template or context chain
//!
//! # Examples
//!
//! ```rust
//! use fsroute::core::ArtifactKind;
//!
//! assert_eq!(ArtifactKind::Template.file_name(fsroute::core::ArtifactForm::Plain), "template.json");
//! assert_eq!(ArtifactKind::from_provider_id("x/c@c-app"), ArtifactKind::Context);
//! ```

pub mod artifact;
pub mod error;
mod provider;

pub use artifact::{Artifact, ArtifactForm, ArtifactKind, RESERVED_FIELDS};
pub use error::{ErrorContext, RouterError, user_friendly_error};
pub use provider::Provider;

/// Result alias used throughout the library.
pub type Result<T, E = RouterError> = std::result::Result<T, E>;
