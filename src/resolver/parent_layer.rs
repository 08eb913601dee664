//! Cross-layer "super" lookups.
//!
//! A template rendering the provider `x/t@th` may ask for the same artifact as
//! served by the *next* layer (`x/t@app`), e.g. to wrap its output. The search
//! walks the layers after the named one in priority order and, in each, first
//! looks for the exact id in the already resolved chain and then does an exact
//! index lookup.

use futures::FutureExt;
use std::sync::Arc;

use super::{LayerSet, ProviderResolver};
use crate::core::{ArtifactKind, Provider, Result, RouterError};
use crate::index::PathIndex;

/// Finds the provider of the next layer for a provider id.
///
/// Cheap to clone; it only holds `Arc`s.
#[derive(Debug, Clone)]
pub struct ParentLayerSearch {
    templates: Arc<LayerSet>,
    contexts: Arc<LayerSet>,
    template_chain: Option<Arc<Provider>>,
    context_chain: Option<Arc<Provider>>,
}

impl ParentLayerSearch {
    /// Creates a search over both layer sets and the chains of one render.
    #[must_use]
    pub fn new(
        templates: Arc<LayerSet>,
        contexts: Arc<LayerSet>,
        template_chain: Option<Arc<Provider>>,
        context_chain: Option<Arc<Provider>>,
    ) -> Self {
        Self {
            templates,
            contexts,
            template_chain,
            context_chain,
        }
    }

    /// Finds the provider serving `id`'s path in a layer after `id`'s layer.
    ///
    /// `id` has the form `<path>/<t|c>[@<layer>]`. Without a layer every layer
    /// is searched. Fails with [`RouterError::FinalNotFound`] when no later
    /// layer has an exact artifact for the path; any other error of a layer
    /// stops the search.
    pub async fn find(&self, id: &str) -> Result<Arc<Provider>> {
        let kind = ArtifactKind::from_provider_id(id);
        let (layers, chain) = match kind {
            ArtifactKind::Template => (&self.templates, self.template_chain.as_ref()),
            ArtifactKind::Context => (&self.contexts, self.context_chain.as_ref()),
        };

        let (tagged_path, current_layer) = match id.rsplit_once('@') {
            Some((path, layer)) => (path, Some(layer)),
            None => (id, None),
        };
        let path = tagged_path.strip_suffix(kind.postfix_tag()).unwrap_or(tagged_path);

        let start = match current_layer {
            Some(layer) => {
                let position = layers.position(layer).ok_or_else(|| RouterError::UnknownLayer {
                    layer: layer.to_string(),
                    kind: kind.to_string(),
                })?;
                position + 1
            }
            None => 0,
        };

        for index in &layers.indexes()[start..] {
            match self.find_in_layer(layers, chain, path, index).await {
                Err(e) if e.is_final_not_found() => {
                    tracing::trace!(id, layer = %index.layer().id, "no provider in layer");
                }
                found => return found,
            }
        }

        Err(RouterError::FinalNotFound {
            id: id.to_string(),
        })
    }

    /// Synchronous variant of [`Self::find`] for template functions.
    ///
    /// Returns `None` if the search would have to wait on I/O, which can only
    /// happen for on-demand layers.
    #[must_use]
    pub fn find_ready(&self, id: &str) -> Option<Result<Arc<Provider>>> {
        self.find(id).now_or_never()
    }

    async fn find_in_layer(
        &self,
        layers: &LayerSet,
        chain: Option<&Arc<Provider>>,
        path: &str,
        index: &PathIndex,
    ) -> Result<Arc<Provider>> {
        let wanted = format!("{path}{}@{}", layers.kind().postfix_tag(), index.layer().id);
        if let Some(found) = chain.and_then(|head| Provider::find(head, &wanted)) {
            return Ok(found);
        }

        match index.lookup_exact(path).await? {
            Some(found) => ProviderResolver::new(layers).resolve_match(index, &found).await,
            None => Err(RouterError::FinalNotFound {
                id: wanted,
            }),
        }
    }
}
