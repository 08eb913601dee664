//! Resolved providers and provider chains.
//!
//! A [`Provider`] is one node of a resolved template or context chain. Providers are
//! immutable once built and linked through `Arc`s, so a chain can be shared between
//! the evaluator, the parent layer search, and concurrent render calls.

use serde_json::{Map, Value};
use std::sync::Arc;

/// One node of a resolved chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Provider {
    id: String,
    layer: String,
    matched_path: String,
    fields: Map<String, Value>,
    parent_url: Option<String>,
    parent: Option<Arc<Provider>>,
}

impl Provider {
    /// Builds a provider node.
    ///
    /// `parent_url` is the URL the artifact declared (kept for diagnostics);
    /// `parent` is the already resolved next node of the chain.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        layer: impl Into<String>,
        matched_path: impl Into<String>,
        fields: Map<String, Value>,
        parent_url: Option<String>,
        parent: Option<Arc<Provider>>,
    ) -> Self {
        Self {
            id: id.into(),
            layer: layer.into(),
            matched_path: matched_path.into(),
            fields,
            parent_url,
            parent,
        }
    }

    /// Resolver-assigned id: `<matched-path>/<t|c>@<layer-id>`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the layer this provider was loaded from.
    #[must_use]
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// The sub-path that actually contained the artifact.
    #[must_use]
    pub fn matched_path(&self) -> &str {
        &self.matched_path
    }

    /// Own fields, mixins included.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Own field by name; does not look at ancestors.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The parent URL declared by the artifact, if any.
    #[must_use]
    pub fn parent_url(&self) -> Option<&str> {
        self.parent_url.as_deref()
    }

    /// Next node of the chain.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Provider>> {
        self.parent.as_ref()
    }

    /// Iterates the chain starting at this provider.
    pub fn chain(&self) -> impl Iterator<Item = &Provider> {
        std::iter::successors(Some(self), |provider| provider.parent.as_deref())
    }

    /// Number of providers in the chain starting at this one.
    #[must_use]
    pub fn chain_len(&self) -> usize {
        self.chain().count()
    }

    /// Ids of the chain starting at this provider, in chain order.
    #[must_use]
    pub fn chain_ids(&self) -> Vec<String> {
        self.chain().map(|provider| provider.id.clone()).collect()
    }

    /// Nearest field named `name` along the chain, with the provider holding it.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<(&Provider, &Value)> {
        self.chain().find_map(|provider| provider.get(name).map(|value| (provider, value)))
    }

    /// Finds the provider with the given id in the chain starting at `this`.
    #[must_use]
    pub fn find(this: &Arc<Self>, id: &str) -> Option<Arc<Provider>> {
        std::iter::successors(Some(Arc::clone(this)), |provider| provider.parent.clone())
            .find(|provider| provider.id == id)
    }
}
