//! Artifact loading capability.
//!
//! The resolution core never reads artifact files itself; it asks an
//! [`ArtifactLoader`] to turn a path into an [`Artifact`]. The default
//! [`FsArtifactLoader`] reads the file with `tokio::fs` and parses it by form.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::Path;

use crate::core::{Artifact, ArtifactForm, Result};

/// Turns an artifact file into an [`Artifact`].
///
/// Implementations must be cheap to share: one loader instance serves every
/// layer and both artifact kinds of a router.
pub trait ArtifactLoader: Send + Sync {
    /// Loads the artifact stored at `path` in the given form.
    fn load<'a>(&'a self, path: &'a Path, form: ArtifactForm) -> BoxFuture<'a, Result<Artifact>>;
}

/// Loads artifacts from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsArtifactLoader;

impl ArtifactLoader for FsArtifactLoader {
    fn load<'a>(&'a self, path: &'a Path, form: ArtifactForm) -> BoxFuture<'a, Result<Artifact>> {
        async move {
            let content = tokio::fs::read_to_string(path).await?;
            tracing::trace!(path = %path.display(), ?form, "loaded artifact file");
            Artifact::parse(&content, form, path)
        }
        .boxed()
    }
}
