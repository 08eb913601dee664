//! The router: resolution orchestrator in front of an evaluator.
//!
//! A [`Router`] owns one [`LayerSet`] per artifact kind. Each
//! [`Router::render`] call resolves the template and the context chain for a
//! URL concurrently, builds the call context, and hands everything to the
//! configured [`Evaluator`] as an [`Invocation`].
//!
//! # Lifecycle
//!
//! 1. [`Router::new`] validates the options and creates empty indexes.
//! 2. [`Router::init`] builds every index when `hot_update` is off. It must
//!    complete before the first render in that mode.
//! 3. [`Router::render`] may be called concurrently; calls share nothing but
//!    the read-only indexes.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fsroute::index::Layer;
//! use fsroute::router::{Router, RouterOptions};
//! use fsroute::templating::TeraEvaluator;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let options = RouterOptions::new(
//!     vec![Layer::new("t-app", "routing")],
//!     vec![Layer::new("c-app", "routing")],
//! );
//! let router = Router::new(options, TeraEvaluator::new())?;
//! router.init().await?;
//! let html = router.render("blog/post?page=2", None, None).await?;
//! println!("{html}");
//! # Ok(())
//! # }
//! ```

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::core::{ArtifactKind, Provider, Result, RouterError};
use crate::index::{ArtifactLoader, FsArtifactLoader, IndexMode, Layer};
use crate::resolver::{LayerSet, ParentLayerSearch, ProviderResolver};

/// Entrypoint used when neither the call nor the options name one.
pub const DEFAULT_ENTRYPOINT: &str = "main";

/// Id given to call contexts that do not set one.
pub const DEFAULT_CALL_CONTEXT_ID: &str = "call/c";

/// Builds the initial call context from `(url, entrypoint)`.
pub type CallContextFactory = Arc<dyn Fn(&str, &str) -> CallContext + Send + Sync>;

/// Router configuration.
#[derive(Clone)]
pub struct RouterOptions {
    /// Template layers in priority order
    pub template_layers: Vec<Layer>,
    /// Context layers in priority order
    pub context_layers: Vec<Layer>,
    /// Default entrypoint field; [`DEFAULT_ENTRYPOINT`] when unset
    pub entrypoint: Option<String>,
    /// Probe the filesystem on every lookup instead of building indexes in `init()`
    pub hot_update: bool,
    /// Builds the call context when `render` is not given one
    pub call_context_factory: Option<CallContextFactory>,
    /// Name of the render-recursion binding
    pub rendering_property: String,
    /// Name of the parent layer search binding
    pub parent_layer_property: String,
    /// Call context field receiving the requested URL
    pub resource_path_property: String,
    /// Passed through to the evaluator
    pub debug_marks: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            template_layers: Vec::new(),
            context_layers: Vec::new(),
            entrypoint: None,
            hot_update: false,
            call_context_factory: None,
            rendering_property: "render".to_string(),
            parent_layer_property: "parentLayer".to_string(),
            resource_path_property: "url".to_string(),
            debug_marks: false,
        }
    }
}

impl fmt::Debug for RouterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterOptions")
            .field("template_layers", &self.template_layers)
            .field("context_layers", &self.context_layers)
            .field("entrypoint", &self.entrypoint)
            .field("hot_update", &self.hot_update)
            .field("call_context_factory", &self.call_context_factory.is_some())
            .field("rendering_property", &self.rendering_property)
            .field("parent_layer_property", &self.parent_layer_property)
            .field("resource_path_property", &self.resource_path_property)
            .field("debug_marks", &self.debug_marks)
            .finish()
    }
}

impl RouterOptions {
    /// Options with the given layers and defaults for everything else.
    #[must_use]
    pub fn new(template_layers: Vec<Layer>, context_layers: Vec<Layer>) -> Self {
        Self {
            template_layers,
            context_layers,
            ..Self::default()
        }
    }

    /// Sets the default entrypoint.
    #[must_use]
    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    /// Selects on-demand (`true`) or precomputed (`false`) indexing.
    #[must_use]
    pub const fn with_hot_update(mut self, hot_update: bool) -> Self {
        self.hot_update = hot_update;
        self
    }

    /// Sets the call context factory.
    #[must_use]
    pub fn with_call_context_factory(
        mut self,
        factory: impl Fn(&str, &str) -> CallContext + Send + Sync + 'static,
    ) -> Self {
        self.call_context_factory = Some(Arc::new(factory));
        self
    }

    /// Enables debug marks in evaluator output.
    #[must_use]
    pub const fn with_debug_marks(mut self, debug_marks: bool) -> Self {
        self.debug_marks = debug_marks;
        self
    }

    /// Index mode implied by `hot_update`.
    #[must_use]
    pub const fn index_mode(&self) -> IndexMode {
        IndexMode::from_hot_update(self.hot_update)
    }

    /// Checks that layer ids are non-empty and unique within each kind.
    pub fn validate(&self) -> Result<()> {
        for (kind, layers) in
            [(ArtifactKind::Template, &self.template_layers), (ArtifactKind::Context, &self.context_layers)]
        {
            let mut seen = HashSet::new();
            for layer in layers {
                if layer.id.is_empty() {
                    return Err(RouterError::ConfigError {
                        message: format!("{kind} layer with directory '{}' has an empty id", layer.base_dir.display()),
                    });
                }
                if !seen.insert(layer.id.as_str()) {
                    return Err(RouterError::ConfigError {
                        message: format!("duplicate {kind} layer id '{}'", layer.id),
                    });
                }
            }
        }

        for (name, value) in [
            ("rendering_property", &self.rendering_property),
            ("parent_layer_property", &self.parent_layer_property),
            ("resource_path_property", &self.resource_path_property),
        ] {
            if value.is_empty() {
                return Err(RouterError::ConfigError {
                    message: format!("'{name}' must not be empty"),
                });
            }
        }

        Ok(())
    }
}

/// The call context handed to the evaluator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallContext {
    /// Context id; [`DEFAULT_CALL_CONTEXT_ID`] when left empty
    pub id: String,
    /// Call-specific fields; the requested URL is added under `resource_path_property`
    pub fields: Map<String, Value>,
    /// Resolved context chain, set by the router
    pub parent: Option<Arc<Provider>>,
}

impl CallContext {
    /// An empty call context with the default id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: DEFAULT_CALL_CONTEXT_ID.to_string(),
            ..Self::default()
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// Names under which router capabilities are exposed to artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    /// Render recursion
    pub rendering: String,
    /// Parent layer search
    pub parent_layer: String,
    /// Requested URL
    pub resource_path: String,
}

/// Everything an evaluator needs for one render.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The URL as requested, query included
    pub url: String,
    /// Resolved template chain; `None` if no template layer matched
    pub template: Option<Arc<Provider>>,
    /// Call context, with the context chain as its parent
    pub call_context: CallContext,
    /// Field of the template chain to evaluate
    pub entrypoint: String,
    /// Whether output should carry provider markers
    pub debug_marks: bool,
    /// Cross-layer lookups for this render
    pub parent_layer: ParentLayerSearch,
    /// Binding names
    pub bindings: Bindings,
}

impl Invocation {
    /// Resolves a name: template chain, then call context fields, then context chain.
    ///
    /// Returns the value with the id of whatever holds it.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<(&str, &Value)> {
        if let Some((provider, value)) = self.template.as_deref().and_then(|head| head.lookup(name)) {
            return Some((provider.id(), value));
        }
        if let Some(value) = self.call_context.fields.get(name) {
            return Some((self.call_context.id.as_str(), value));
        }
        self.call_context
            .parent
            .as_deref()
            .and_then(|head| head.lookup(name))
            .map(|(provider, value)| (provider.id(), value))
    }

    /// Every name reachable through [`Self::lookup`], nearest value first.
    #[must_use]
    pub fn visible_fields(&self) -> Map<String, Value> {
        let template = self.template.iter().flat_map(|head| head.chain());
        let context = self.call_context.parent.iter().flat_map(|head| head.chain());

        let mut visible = Map::new();
        let mut add = |fields: &Map<String, Value>| {
            for (name, value) in fields {
                if !visible.contains_key(name) {
                    visible.insert(name.clone(), value.clone());
                }
            }
        };
        template.for_each(|provider| add(provider.fields()));
        add(&self.call_context.fields);
        context.for_each(|provider| add(provider.fields()));
        visible
    }
}

/// Executes a resolved invocation.
///
/// `router` is the router that produced the invocation, so evaluators can
/// render other URLs while evaluating (exposed under
/// [`Bindings::rendering`]).
pub trait Evaluator: Send + Sync + Sized {
    /// What a render produces.
    type Output: Send;

    /// Evaluates `invocation`.
    fn evaluate<'a>(
        &'a self,
        router: &'a Router<Self>,
        invocation: Invocation,
    ) -> BoxFuture<'a, Result<Self::Output>>;
}

/// Resolves URLs into template and context chains and renders them.
///
/// Cloning is cheap: every part is shared behind an `Arc`, so evaluators can
/// keep a handle for renders started from inside an evaluation.
pub struct Router<E> {
    options: Arc<RouterOptions>,
    templates: Arc<LayerSet>,
    contexts: Arc<LayerSet>,
    evaluator: Arc<E>,
}

impl<E> Clone for Router<E> {
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
            templates: Arc::clone(&self.templates),
            contexts: Arc::clone(&self.contexts),
            evaluator: Arc::clone(&self.evaluator),
        }
    }
}

impl<E> fmt::Debug for Router<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("options", &self.options)
            .field("templates", &self.templates)
            .field("contexts", &self.contexts)
            .finish_non_exhaustive()
    }
}

impl<E: Evaluator> Router<E> {
    /// Creates a router that loads artifacts from the filesystem.
    pub fn new(options: RouterOptions, evaluator: E) -> Result<Self> {
        Self::with_loader(options, evaluator, Arc::new(FsArtifactLoader))
    }

    /// Creates a router with a custom artifact loader.
    pub fn with_loader(options: RouterOptions, evaluator: E, loader: Arc<dyn ArtifactLoader>) -> Result<Self> {
        options.validate()?;

        let mode = options.index_mode();
        let templates =
            LayerSet::with_loader(ArtifactKind::Template, &options.template_layers, mode, Arc::clone(&loader));
        let contexts = LayerSet::with_loader(ArtifactKind::Context, &options.context_layers, mode, loader);

        Ok(Self {
            options: Arc::new(options),
            templates: Arc::new(templates),
            contexts: Arc::new(contexts),
            evaluator: Arc::new(evaluator),
        })
    }

    /// The options this router was created with.
    #[must_use]
    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// The evaluator.
    #[must_use]
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Layers of the given kind.
    #[must_use]
    pub fn layers(&self, kind: ArtifactKind) -> &Arc<LayerSet> {
        match kind {
            ArtifactKind::Template => &self.templates,
            ArtifactKind::Context => &self.contexts,
        }
    }

    /// Builds every index (template and context) concurrently.
    ///
    /// Does nothing in hot-update mode.
    pub async fn init(&self) -> Result<()> {
        if self.options.hot_update {
            tracing::debug!("hot update enabled; indexes read the filesystem on demand");
            return Ok(());
        }

        let (templates, contexts) = tokio::try_join!(self.templates.build_all(), self.contexts.build_all())?;
        tracing::info!(templates, contexts, "router indexes built");
        Ok(())
    }

    /// Resolves the chain of one kind for `url` without rendering.
    pub async fn resolve(&self, kind: ArtifactKind, url: &str) -> Result<Option<Arc<Provider>>> {
        ProviderResolver::new(self.layers(kind)).resolve(url).await
    }

    /// Resolves both chains for `url` and evaluates them.
    ///
    /// `entrypoint` falls back to the configured entrypoint, then to
    /// [`DEFAULT_ENTRYPOINT`]. `call_context` falls back to the configured
    /// factory, then to an empty context.
    pub async fn render(
        &self,
        url: &str,
        entrypoint: Option<&str>,
        call_context: Option<CallContext>,
    ) -> Result<E::Output> {
        let invocation = self.invocation(url, entrypoint, call_context).await?;
        self.evaluator.evaluate(self, invocation).await
    }

    /// Resolves both chains for `url` and builds the [`Invocation`] that
    /// [`Self::render`] would evaluate, with the same defaults.
    pub async fn invocation(
        &self,
        url: &str,
        entrypoint: Option<&str>,
        call_context: Option<CallContext>,
    ) -> Result<Invocation> {
        let entrypoint = entrypoint
            .map(str::to_string)
            .or_else(|| self.options.entrypoint.clone())
            .unwrap_or_else(|| DEFAULT_ENTRYPOINT.to_string());

        let mut call_context = match call_context {
            Some(call_context) => call_context,
            None => self
                .options
                .call_context_factory
                .as_ref()
                .map_or_else(CallContext::new, |factory| factory(url, &entrypoint)),
        };
        if call_context.id.is_empty() {
            call_context.id = DEFAULT_CALL_CONTEXT_ID.to_string();
        }

        let templates = ProviderResolver::new(&self.templates);
        let contexts = ProviderResolver::new(&self.contexts);
        let (template, context) = tokio::try_join!(templates.resolve(url), contexts.resolve(url))?;

        tracing::debug!(
            url,
            entrypoint = %entrypoint,
            template = ?template.as_ref().map(|head| head.chain_ids()),
            context = ?context.as_ref().map(|head| head.chain_ids()),
            "resolved render chains"
        );

        call_context
            .fields
            .insert(self.options.resource_path_property.clone(), Value::String(url.to_string()));
        call_context.parent = context.clone();

        Ok(Invocation {
            url: url.to_string(),
            parent_layer: ParentLayerSearch::new(
                Arc::clone(&self.templates),
                Arc::clone(&self.contexts),
                template.clone(),
                context,
            ),
            template,
            call_context,
            entrypoint,
            debug_marks: self.options.debug_marks,
            bindings: Bindings {
                rendering: self.options.rendering_property.clone(),
                parent_layer: self.options.parent_layer_property.clone(),
                resource_path: self.options.resource_path_property.clone(),
            },
        })
    }
}
