//! Provider chain resolution.
//!
//! [`ProviderResolver`] turns a URL into a linked chain of [`Provider`]s for one
//! artifact kind. Resolution of a URL works as follows:
//!
//! 1. The URL is recorded in a [`VisitedUrls`] map; a URL seen before fails
//!    with [`RouterError::CircularReference`].
//! 2. Every configured layer is queried concurrently with a longest-prefix
//!    lookup. Results keep the configured layer order.
//! 3. Only matches whose matched path is the deepest among all matches are
//!    kept. A deeper match in a lower-priority layer beats a shallower match in
//!    a higher-priority layer.
//! 4. Each kept match gets its id (`<matched-path>/<t|c>@<layer>`) and its
//!    mixins merged (see [`mixin`]).
//! 5. All kept matches must declare the same parent URL, otherwise the
//!    resolution fails with [`RouterError::ProviderMismatch`].
//! 6. The kept matches are linked in layer order, and the resolved parent
//!    chain (if the parent URL is non-empty) is attached at the tail.
//!
//! When no layer matches, the result is `None`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fsroute::core::ArtifactKind;
//! use fsroute::index::{IndexMode, Layer};
//! use fsroute::resolver::{LayerSet, ProviderResolver};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let layers = LayerSet::from_layers(
//!     ArtifactKind::Template,
//!     &[Layer::new("theme", "./theme"), Layer::new("app", "./app")],
//!     IndexMode::OnDemand,
//! );
//! let chain = ProviderResolver::new(&layers).resolve("blog/post").await?;
//! if let Some(head) = chain {
//!     println!("{:?}", head.chain_ids());
//! }
//! # Ok(())
//! # }
//! ```

pub mod mixin;
mod parent_layer;

pub use mixin::MixinMerger;
pub use parent_layer::ParentLayerSearch;

use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::error::visit_map_json;
use crate::core::{ArtifactKind, Provider, Result, RouterError};
use crate::index::{ArtifactLoader, FsArtifactLoader, IndexMatch, IndexMode, Layer, PathIndex, normalize_url};

/// Order in which URLs were visited while following `parent` links.
///
/// Displays as a JSON object of URL to visit order, e.g. `{"a":0,"b":1}`.
#[derive(Debug, Default, Clone)]
pub struct VisitedUrls {
    order: HashMap<String, usize>,
    next: usize,
}

impl VisitedUrls {
    /// Records `url`, failing if it was already visited.
    pub fn visit(&mut self, url: &str) -> Result<usize> {
        let key = normalize_url(url);
        if self.order.contains_key(&key) {
            return Err(RouterError::CircularReference {
                url: url.to_string(),
                visited: self.entries(),
            });
        }

        let position = self.next;
        self.order.insert(key, position);
        self.next += 1;
        Ok(position)
    }

    /// Visit order of `url`, if it was visited.
    #[must_use]
    pub fn position(&self, url: &str) -> Option<usize> {
        self.order.get(&normalize_url(url)).copied()
    }

    /// Visited URLs with their visit order, in visit order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, usize)> {
        let mut entries: Vec<(String, usize)> =
            self.order.iter().map(|(url, position)| (url.clone(), *position)).collect();
        entries.sort_by_key(|(_, position)| *position);
        entries
    }

    /// Number of visited URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing was visited yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl fmt::Display for VisitedUrls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&visit_map_json(&self.entries()))
    }
}

/// The ordered layers of one artifact kind, one [`PathIndex`] per layer.
#[derive(Debug)]
pub struct LayerSet {
    kind: ArtifactKind,
    indexes: Vec<PathIndex>,
}

impl LayerSet {
    /// Creates a layer set that loads artifacts from the filesystem.
    #[must_use]
    pub fn from_layers(kind: ArtifactKind, layers: &[Layer], mode: IndexMode) -> Self {
        Self::with_loader(kind, layers, mode, Arc::new(FsArtifactLoader))
    }

    /// Creates a layer set with a custom artifact loader.
    #[must_use]
    pub fn with_loader(
        kind: ArtifactKind,
        layers: &[Layer],
        mode: IndexMode,
        loader: Arc<dyn ArtifactLoader>,
    ) -> Self {
        let indexes = layers
            .iter()
            .map(|layer| PathIndex::new(layer.clone(), kind, mode, Arc::clone(&loader)))
            .collect();
        Self {
            kind,
            indexes,
        }
    }

    /// Artifact kind served by every index of this set.
    #[must_use]
    pub const fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Indexes in priority order.
    #[must_use]
    pub fn indexes(&self) -> &[PathIndex] {
        &self.indexes
    }

    /// Position of the layer with the given id.
    #[must_use]
    pub fn position(&self, layer_id: &str) -> Option<usize> {
        self.indexes.iter().position(|index| index.layer().id == layer_id)
    }

    /// Index of the layer with the given id.
    #[must_use]
    pub fn index(&self, layer_id: &str) -> Option<&PathIndex> {
        self.position(layer_id).map(|position| &self.indexes[position])
    }

    /// Builds every index concurrently. Returns the total artifact count.
    pub async fn build_all(&self) -> Result<usize> {
        let counts = try_join_all(self.indexes.iter().map(PathIndex::build_all)).await?;
        Ok(counts.into_iter().sum())
    }
}

/// A provider whose mixins are merged but whose parent is not linked yet.
#[derive(Debug)]
struct PendingProvider {
    id: String,
    layer: String,
    matched_path: String,
    fields: Map<String, Value>,
    parent_url: Option<String>,
}

impl PendingProvider {
    fn link(self, parent: Option<Arc<Provider>>) -> Provider {
        Provider::new(self.id, self.layer, self.matched_path, self.fields, self.parent_url, parent)
    }
}

/// Resolves URLs into provider chains over one [`LayerSet`].
#[derive(Debug, Clone, Copy)]
pub struct ProviderResolver<'a> {
    layers: &'a LayerSet,
}

impl<'a> ProviderResolver<'a> {
    /// Creates a resolver over `layers`.
    #[must_use]
    pub const fn new(layers: &'a LayerSet) -> Self {
        Self {
            layers,
        }
    }

    /// Resolves `url` with a fresh visit map.
    pub async fn resolve(&self, url: &str) -> Result<Option<Arc<Provider>>> {
        let mut visited = VisitedUrls::default();
        self.resolve_with(url, &mut visited).await
    }

    /// Resolves `url`, sharing `visited` with the caller.
    ///
    /// Parent URLs are resolved with the same map, so a `parent` link back to
    /// any URL of the current resolution fails with
    /// [`RouterError::CircularReference`].
    pub fn resolve_with<'b>(
        &'b self,
        url: &'b str,
        visited: &'b mut VisitedUrls,
    ) -> BoxFuture<'b, Result<Option<Arc<Provider>>>> {
        async move {
            visited.visit(url)?;

            let lookups = try_join_all(self.layers.indexes().iter().map(|index| async move {
                Ok::<_, RouterError>(index.lookup(url).await?.map(|found| (index, found)))
            }))
            .await?;
            let matches: Vec<(&PathIndex, IndexMatch)> = lookups.into_iter().flatten().collect();

            let Some(depth) = matches.iter().map(|(_, found)| found.depth()).max() else {
                tracing::debug!(kind = %self.layers.kind(), url, "no layer matched");
                return Ok(None);
            };

            let kept: Vec<_> = matches.into_iter().filter(|(_, found)| found.depth() == depth).collect();
            let pending = try_join_all(kept.iter().map(|(index, found)| self.prepare(index, found))).await?;

            let parent_url = pending.first().and_then(|provider| provider.parent_url.clone());
            if pending.iter().any(|provider| provider.parent_url != parent_url) {
                return Err(RouterError::ProviderMismatch {
                    url: url.to_string(),
                    providers: pending.iter().map(|provider| provider.id.clone()).collect(),
                });
            }

            tracing::debug!(
                kind = %self.layers.kind(),
                url,
                providers = ?pending.iter().map(|provider| provider.id.as_str()).collect::<Vec<_>>(),
                parent = parent_url.as_deref().unwrap_or(""),
                "resolved providers"
            );

            let tail = match parent_url.as_deref() {
                Some(parent) => self.resolve_with(parent, visited).await?,
                None => None,
            };

            Ok(pending.into_iter().rev().fold(tail, |next, provider| Some(Arc::new(provider.link(next)))))
        }
        .boxed()
    }

    /// Builds the provider for one index match on its own.
    ///
    /// Mixins are merged and the parent URL (if any) is resolved over all
    /// layers with a fresh visit map seeded with the matched path.
    pub async fn resolve_match(&self, index: &PathIndex, found: &IndexMatch) -> Result<Arc<Provider>> {
        let pending = self.prepare(index, found).await?;
        let tail = match pending.parent_url.as_deref() {
            Some(parent) => {
                let mut visited = VisitedUrls::default();
                visited.visit(&found.matched_path)?;
                self.resolve_with(parent, &mut visited).await?
            }
            None => None,
        };
        Ok(Arc::new(pending.link(tail)))
    }

    async fn prepare(&self, index: &PathIndex, found: &IndexMatch) -> Result<PendingProvider> {
        let layer = &index.layer().id;
        let id = format!("{}{}@{layer}", found.matched_path, index.kind().postfix_tag());

        let mut fields = found.artifact.fields.clone();
        MixinMerger::new(index).merge(&id, &mut fields, &found.artifact.mixin).await?;

        Ok(PendingProvider {
            id,
            layer: layer.clone(),
            matched_path: found.matched_path.clone(),
            fields,
            parent_url: found.artifact.parent.clone(),
        })
    }
}
