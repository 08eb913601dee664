//! Configuration file support.
//!
//! A router is configured programmatically with
//! [`RouterOptions`](crate::router::RouterOptions); the CLI reads the same
//! options from a TOML file (`fsroute.toml` by default):
//!
//! ```toml
//! entrypoint = "main"
//! hot_update = false
//! debug_marks = false
//! rendering_property = "render"
//! parent_layer_property = "parentLayer"
//! resource_path_property = "url"
//!
//! [[template_layers]]
//! id = "t-theme"
//! dir = "themes/default"
//!
//! [[template_layers]]
//! id = "t-app"
//! dir = "apps/my-app/routing"
//!
//! [[context_layers]]
//! id = "c-app"
//! dir = "apps/my-app/routing"
//! ```
//!
//! Every key is optional. Relative layer directories are resolved against the
//! directory containing the config file. The call context factory has no file
//! form.

pub mod parser;

pub use parser::parse_config;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::index::Layer;
use crate::router::RouterOptions;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "fsroute.toml";

/// Contents of a router config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Default entrypoint field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    /// On-demand indexing instead of building indexes at startup
    pub hot_update: bool,
    /// Wrap rendered output in provider markers
    pub debug_marks: bool,
    /// Name of the render-recursion binding
    pub rendering_property: String,
    /// Name of the parent layer search binding
    pub parent_layer_property: String,
    /// Call context field receiving the requested URL
    pub resource_path_property: String,
    /// Template layers in priority order
    pub template_layers: Vec<Layer>,
    /// Context layers in priority order
    pub context_layers: Vec<Layer>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        let options = RouterOptions::default();
        Self {
            entrypoint: None,
            hot_update: options.hot_update,
            debug_marks: options.debug_marks,
            rendering_property: options.rendering_property,
            parent_layer_property: options.parent_layer_property,
            resource_path_property: options.resource_path_property,
            template_layers: Vec::new(),
            context_layers: Vec::new(),
        }
    }
}

impl RouterConfig {
    /// Loads a config file and resolves its layer directories.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = parse_config(path)?;
        let base = path.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let config = config.resolve_dirs(base);

        config
            .to_options()
            .validate()
            .with_context(|| format!("Invalid router configuration in {}", path.display()))?;

        tracing::debug!(
            path = %path.display(),
            template_layers = config.template_layers.len(),
            context_layers = config.context_layers.len(),
            "loaded router config"
        );
        Ok(config)
    }

    /// Makes relative layer directories relative to `base`.
    #[must_use]
    pub fn resolve_dirs(mut self, base: &Path) -> Self {
        for layer in self.template_layers.iter_mut().chain(self.context_layers.iter_mut()) {
            if layer.base_dir.is_relative() {
                layer.base_dir = base.join(&layer.base_dir);
            }
        }
        self
    }

    /// Router options equivalent to this config.
    #[must_use]
    pub fn to_options(&self) -> RouterOptions {
        RouterOptions {
            template_layers: self.template_layers.clone(),
            context_layers: self.context_layers.clone(),
            entrypoint: self.entrypoint.clone(),
            hot_update: self.hot_update,
            call_context_factory: None,
            rendering_property: self.rendering_property.clone(),
            parent_layer_property: self.parent_layer_property.clone(),
            resource_path_property: self.resource_path_property.clone(),
            debug_marks: self.debug_marks,
        }
    }
}
