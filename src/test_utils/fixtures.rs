//! Layered directory fixtures
//!
//! [`LayeredFixture`] writes artifact files into layer directories under a
//! temporary root and builds routers over them.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::core::ArtifactKind;
use crate::index::Layer;
use crate::router::RouterOptions;

/// A temporary tree of layer directories.
///
/// Each layer lives in `<root>/<layer-id>`. Layers are added in priority
/// order; template and context layers are tracked separately.
#[derive(Debug)]
pub struct LayeredFixture {
    temp: TempDir,
    template_layers: Vec<Layer>,
    context_layers: Vec<Layer>,
}

impl LayeredFixture {
    /// Creates an empty fixture.
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: TempDir::new().context("Failed to create fixture directory")?,
            template_layers: Vec::new(),
            context_layers: Vec::new(),
        })
    }

    /// Root directory of the fixture.
    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Directory of the layer with the given id.
    pub fn layer_dir(&self, id: &str) -> PathBuf {
        self.temp.path().join(id)
    }

    /// Appends a template layer stored in `<root>/<id>`.
    pub fn template_layer(mut self, id: &str) -> Self {
        let layer = Layer::new(id, self.layer_dir(id));
        self.template_layers.push(layer);
        self
    }

    /// Appends a context layer stored in `<root>/<id>`.
    pub fn context_layer(mut self, id: &str) -> Self {
        let layer = Layer::new(id, self.layer_dir(id));
        self.context_layers.push(layer);
        self
    }

    /// Writes raw `content` to `<root>/<layer>/<path>`.
    pub fn write(&self, layer: &str, path: &str, content: &str) -> Result<PathBuf> {
        let file = self.layer_dir(layer).join(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&file, content).with_context(|| format!("Failed to write {}", file.display()))?;
        Ok(file)
    }

    /// Writes a plain (JSON) artifact of `kind` for `url` in `layer`.
    pub fn artifact(&self, layer: &str, kind: ArtifactKind, url: &str, value: Value) -> Result<PathBuf> {
        self.write(layer, &artifact_path(kind, url, "json"), &serde_json::to_string_pretty(&value)?)
    }

    /// Writes a plain template artifact.
    pub fn template(&self, layer: &str, url: &str, value: Value) -> Result<PathBuf> {
        self.artifact(layer, ArtifactKind::Template, url, value)
    }

    /// Writes a plain context artifact.
    pub fn context(&self, layer: &str, url: &str, value: Value) -> Result<PathBuf> {
        self.artifact(layer, ArtifactKind::Context, url, value)
    }

    /// Writes a module (TOML) artifact whose `[default]` table is `value`.
    pub fn module(&self, layer: &str, kind: ArtifactKind, url: &str, value: Value) -> Result<PathBuf> {
        let mut document = toml::Table::new();
        document.insert("default".to_string(), toml::Value::try_from(value)?);
        self.write(layer, &artifact_path(kind, url, "toml"), &toml::to_string(&document)?)
    }

    /// Router options over the configured layers.
    pub fn options(&self) -> RouterOptions {
        RouterOptions::new(self.template_layers.clone(), self.context_layers.clone())
    }
}

fn artifact_path(kind: ArtifactKind, url: &str, extension: &str) -> String {
    let dir = url.trim_matches('/');
    if dir.is_empty() {
        format!("{}.{extension}", kind.base_name())
    } else {
        format!("{dir}/{}.{extension}", kind.base_name())
    }
}
