//! Per-layer path index.
//!
//! A [`PathIndex`] answers "which artifact of this kind serves this URL in this
//! layer?" for one (base directory, artifact kind) pair. It runs in one of two
//! modes, fixed at construction:
//!
//! - [`IndexMode::OnDemand`]: every lookup checks the live filesystem, so edited
//!   artifacts are picked up on the next render.
//! - [`IndexMode::Precomputed`]: [`PathIndex::build_all`] walks the whole base
//!   directory once and stores every artifact by its directory-relative path;
//!   lookups afterwards only consult that map and never touch the filesystem.
//!
//! Lookups normalize the URL first: the query suffix is dropped and the path is
//! split into non-empty segments (`.` and `..` segments are dropped too, so a
//! lookup never leaves the base directory). Prefix lookups try the full segment
//! sequence, then successively shorter ones down to the root (the empty path).

pub mod loader;

pub use loader::{ArtifactLoader, FsArtifactLoader};

use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::core::{Artifact, ArtifactForm, ArtifactKind, Result, RouterError};

/// One configured layer: an id and the base directory it serves from.
///
/// The position of a layer in its configured list is its override priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layer {
    /// Layer id, used in provider ids (`x/t@<id>`)
    pub id: String,
    /// Base directory of the layer
    #[serde(alias = "dir")]
    pub base_dir: PathBuf,
}

impl Layer {
    /// Creates a layer.
    pub fn new(id: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            base_dir: base_dir.into(),
        }
    }
}

/// How a [`PathIndex`] answers lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexMode {
    /// Probe the filesystem on every lookup
    OnDemand,
    /// Probe a map built once by [`PathIndex::build_all`]
    Precomputed,
}

impl IndexMode {
    /// Maps the `hot_update` option to a mode.
    #[must_use]
    pub const fn from_hot_update(hot_update: bool) -> Self {
        if hot_update {
            Self::OnDemand
        } else {
            Self::Precomputed
        }
    }
}

/// A successful lookup: the artifact and the sub-path that contained it.
#[derive(Debug, Clone)]
pub struct IndexMatch {
    /// The loaded artifact
    pub artifact: Arc<Artifact>,
    /// Matched sub-path joined by `/` (empty for the layer root)
    pub matched_path: String,
}

impl IndexMatch {
    /// Number of segments in the matched path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.matched_path.split('/').filter(|segment| !segment.is_empty()).count()
    }
}

/// Splits a URL into normalized path segments.
///
/// ```rust
/// use fsroute::index::split_url;
///
/// assert_eq!(split_url("/a//b/?x=1"), vec!["a", "b"]);
/// assert_eq!(split_url("../a/./b"), vec!["a", "b"]);
/// assert!(split_url("").is_empty());
/// ```
#[must_use]
pub fn split_url(url: &str) -> Vec<&str> {
    let path = url.split_once('?').map_or(url, |(path, _)| path);
    path.split('/').filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..").collect()
}

/// Normalized form of a URL: its segments joined by `/`.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    split_url(url).join("/")
}

/// Index of one layer for one artifact kind.
pub struct PathIndex {
    layer: Layer,
    kind: ArtifactKind,
    mode: IndexMode,
    loader: Arc<dyn ArtifactLoader>,
    cache: OnceLock<HashMap<String, Arc<Artifact>>>,
}

impl fmt::Debug for PathIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathIndex")
            .field("layer", &self.layer)
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .field("indexed", &self.cache.get().map(HashMap::len))
            .finish_non_exhaustive()
    }
}

impl PathIndex {
    /// Creates an empty index. Precomputed indexes must be built before use.
    pub fn new(
        layer: Layer,
        kind: ArtifactKind,
        mode: IndexMode,
        loader: Arc<dyn ArtifactLoader>,
    ) -> Self {
        Self {
            layer,
            kind,
            mode,
            loader,
            cache: OnceLock::new(),
        }
    }

    /// The layer this index serves.
    #[must_use]
    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    /// The artifact kind this index serves.
    #[must_use]
    pub const fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// The lookup mode.
    #[must_use]
    pub const fn mode(&self) -> IndexMode {
        self.mode
    }

    /// Whether a precomputed map is available.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Sorted list of indexed paths, or `None` if nothing was built.
    #[must_use]
    pub fn indexed_paths(&self) -> Option<Vec<String>> {
        self.cache.get().map(|cache| {
            let mut paths: Vec<String> = cache.keys().cloned().collect();
            paths.sort();
            paths
        })
    }

    /// Longest-prefix lookup.
    ///
    /// Returns the artifact of the deepest ancestor of `url` (the URL itself
    /// included, the layer root last) that contains one, or `None`.
    pub async fn lookup(&self, url: &str) -> Result<Option<IndexMatch>> {
        let segments = split_url(url);

        if let Some(cache) = self.materialized()? {
            return Ok((0..=segments.len()).rev().find_map(|depth| cached_match(cache, &segments[..depth])));
        }

        for depth in (0..=segments.len()).rev() {
            if let Some(found) = self.artifact_at(&segments[..depth]).await? {
                tracing::debug!(
                    layer = %self.layer.id,
                    kind = %self.kind,
                    url,
                    matched = %found.matched_path,
                    "prefix lookup hit"
                );
                return Ok(Some(found));
            }
        }

        Ok(None)
    }

    /// Exact lookup: only the full normalized path of `url` is checked.
    pub async fn lookup_exact(&self, url: &str) -> Result<Option<IndexMatch>> {
        let segments = split_url(url);

        if let Some(cache) = self.materialized()? {
            return Ok(cached_match(cache, &segments));
        }

        self.artifact_at(&segments).await
    }

    /// Walks the base directory once and stores every artifact found.
    ///
    /// A no-op in on-demand mode and on an index that is already built. A
    /// missing base directory yields an empty index. Returns the number of
    /// indexed artifacts.
    pub async fn build_all(&self) -> Result<usize> {
        if self.mode == IndexMode::OnDemand {
            return Ok(0);
        }
        if let Some(cache) = self.cache.get() {
            return Ok(cache.len());
        }

        let entries = if metadata_if_exists(&self.layer.base_dir).await?.is_some_and(|m| m.is_dir()) {
            self.collect_dir(String::new(), self.layer.base_dir.clone(), Vec::new()).await?
        } else {
            tracing::warn!(
                layer = %self.layer.id,
                dir = %self.layer.base_dir.display(),
                "layer base directory does not exist; index is empty"
            );
            Vec::new()
        };

        let map: HashMap<String, Arc<Artifact>> = entries.into_iter().collect();
        if self.cache.set(map).is_err() {
            tracing::debug!(layer = %self.layer.id, "index was built concurrently; keeping the first");
        }

        let count = self.cache.get().map_or(0, HashMap::len);
        tracing::debug!(layer = %self.layer.id, kind = %self.kind, count, "built path index");
        Ok(count)
    }

    fn materialized(&self) -> Result<Option<&HashMap<String, Arc<Artifact>>>> {
        match self.mode {
            IndexMode::OnDemand => Ok(None),
            IndexMode::Precomputed => self.cache.get().map(Some).ok_or_else(|| RouterError::NotInitialized {
                layer: self.layer.id.clone(),
            }),
        }
    }

    fn dir_for(&self, segments: &[&str]) -> PathBuf {
        segments.iter().fold(self.layer.base_dir.clone(), |dir, segment| dir.join(segment))
    }

    async fn artifact_at(&self, segments: &[&str]) -> Result<Option<IndexMatch>> {
        let dir = self.dir_for(segments);

        for form in ArtifactForm::ALL {
            let file = dir.join(self.kind.file_name(form));
            if metadata_if_exists(&file).await?.is_some_and(|m| m.is_file()) {
                let artifact = self.loader.load(&file, form).await?;
                return Ok(Some(IndexMatch {
                    artifact: Arc::new(artifact),
                    matched_path: segments.join("/"),
                }));
            }
        }

        Ok(None)
    }

    /// Collects the artifacts below `dir`.
    ///
    /// Symlinked directories are followed, except into a directory that is
    /// already being walked; `ancestors` holds the canonical paths above `dir`.
    fn collect_dir(
        &self,
        relative: String,
        dir: PathBuf,
        mut ancestors: Vec<PathBuf>,
    ) -> BoxFuture<'_, Result<Vec<(String, Arc<Artifact>)>>> {
        async move {
            let canonical = tokio::fs::canonicalize(&dir).await?;
            if ancestors.contains(&canonical) {
                tracing::warn!(
                    layer = %self.layer.id,
                    dir = %dir.display(),
                    "directory links back to one of its ancestors; skipping"
                );
                return Ok(Vec::new());
            }
            ancestors.push(canonical);

            let mut reader = tokio::fs::read_dir(&dir).await?;
            let mut names = Vec::new();
            while let Some(entry) = reader.next_entry().await? {
                names.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
            }

            let classified = try_join_all(names.into_iter().map(|(name, path)| async move {
                let entry = match metadata_if_exists(&path).await? {
                    Some(meta) if meta.is_dir() => DirEntry::Directory(name, path),
                    Some(meta) if meta.is_file() => {
                        self.kind.form_of(&name).map_or(DirEntry::Other, |form| DirEntry::Artifact(form, path))
                    }
                    _ => DirEntry::Other,
                };
                Ok::<_, RouterError>(entry)
            }))
            .await?;

            let mut subdirs = Vec::new();
            let mut artifact_file: Option<(ArtifactForm, PathBuf)> = None;
            for entry in classified {
                match entry {
                    DirEntry::Directory(name, path) => {
                        let child = if relative.is_empty() {
                            name
                        } else {
                            format!("{relative}/{name}")
                        };
                        subdirs.push((child, path));
                    }
                    DirEntry::Artifact(form, path) => {
                        // plain wins over module regardless of listing order
                        if artifact_file.as_ref().is_none_or(|(current, _)| *current == ArtifactForm::Module) {
                            artifact_file = Some((form, path));
                        }
                    }
                    DirEntry::Other => {}
                }
            }

            let own = async {
                match &artifact_file {
                    Some((form, path)) => {
                        let artifact = self.loader.load(path, *form).await?;
                        Ok::<_, RouterError>(Some((relative.clone(), Arc::new(artifact))))
                    }
                    None => Ok(None),
                }
            };
            let nested = try_join_all(
                subdirs.into_iter().map(|(child, path)| self.collect_dir(child, path, ancestors.clone())),
            );
            let (own, nested) = futures::try_join!(own, nested)?;

            let mut entries: Vec<(String, Arc<Artifact>)> = nested.into_iter().flatten().collect();
            entries.extend(own);
            Ok(entries)
        }
        .boxed()
    }
}

enum DirEntry {
    Directory(String, PathBuf),
    Artifact(ArtifactForm, PathBuf),
    Other,
}

fn cached_match(cache: &HashMap<String, Arc<Artifact>>, segments: &[&str]) -> Option<IndexMatch> {
    let path = segments.join("/");
    cache.get(&path).map(|artifact| IndexMatch {
        artifact: Arc::clone(artifact),
        matched_path: path,
    })
}

/// Metadata of `path`, or `None` if it does not exist.
///
/// A path component that is a file (not a directory) also counts as missing;
/// every other I/O error is returned unchanged.
async fn metadata_if_exists(path: &Path) -> Result<Option<std::fs::Metadata>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
