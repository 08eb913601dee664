//! Artifact kinds, file forms, and the raw artifact loaded from disk.
//!
//! An artifact is the file-level view of a provider: its declared `parent` URL,
//! its `mixin` list, and every other field. The resolver turns artifacts into
//! [`Provider`](super::Provider)s by assigning ids, merging mixins, and linking parents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

use super::RouterError;

/// Field names the resolver owns; they are never copied from mixins.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "parent", "mixin"];

/// The two parallel resolution namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Template providers (`template.json` / `template.toml`)
    Template,
    /// Context providers (`context.json` / `context.toml`)
    Context,
}

impl ArtifactKind {
    /// File stem of artifacts of this kind.
    #[must_use]
    pub const fn base_name(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Context => "context",
        }
    }

    /// Tag appended to the matched path when building provider ids.
    #[must_use]
    pub const fn postfix_tag(self) -> &'static str {
        match self {
            Self::Template => "/t",
            Self::Context => "/c",
        }
    }

    /// Infers the kind from a provider id such as `x/t@app` or `x/c`.
    ///
    /// Anything not ending in the template tag is treated as a context id.
    #[must_use]
    pub fn from_provider_id(id: &str) -> Self {
        let without_layer = id.rsplit_once('@').map_or(id, |(path, _)| path);
        if without_layer.ends_with(Self::Template.postfix_tag()) {
            Self::Template
        } else {
            Self::Context
        }
    }

    /// File name of an artifact of this kind in the given form.
    #[must_use]
    pub fn file_name(self, form: ArtifactForm) -> String {
        format!("{}.{}", self.base_name(), form.extension())
    }

    /// Which form (if any) a directory entry named `file_name` represents.
    #[must_use]
    pub fn form_of(self, file_name: &str) -> Option<ArtifactForm> {
        ArtifactForm::ALL.into_iter().find(|form| self.file_name(*form) == file_name)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "template" | "t" => Ok(Self::Template),
            "context" | "c" => Ok(Self::Context),
            _ => Err(RouterError::ConfigError {
                message: format!("unknown artifact kind '{s}' (expected 'template' or 'context')"),
            }),
        }
    }
}

/// The two recognized artifact file shapes.
///
/// Both are treated identically once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactForm {
    /// `<kind>.json`: the JSON object is the provider
    Plain,
    /// `<kind>.toml`: the `[default]` table is the provider
    Module,
}

impl ArtifactForm {
    /// Probe order: plain before module.
    pub const ALL: [Self; 2] = [Self::Plain, Self::Module];

    /// File extension of this form.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Plain => "json",
            Self::Module => "toml",
        }
    }
}

/// A loaded artifact file, before id assignment and mixin merging.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Declared parent URL, if any
    pub parent: Option<String>,
    /// Declared mixin URLs, in order
    pub mixin: Vec<String>,
    /// All non-reserved fields
    pub fields: Map<String, Value>,
    /// File the artifact was loaded from
    pub source: PathBuf,
}

impl Artifact {
    /// Splits a loaded object into reserved and ordinary fields.
    ///
    /// An `id` present in the file is dropped: ids are always assigned by the
    /// resolver. An empty `parent` string counts as no parent.
    pub fn from_object(mut object: Map<String, Value>, source: &Path) -> Result<Self, RouterError> {
        object.remove("id");

        let parent = match object.remove("parent") {
            None | Some(Value::Null) => None,
            Some(Value::String(url)) if url.is_empty() => None,
            Some(Value::String(url)) => Some(url),
            Some(other) => {
                return Err(invalid(source, format!("'parent' must be a string, found {other}")));
            }
        };

        let mixin = match object.remove("mixin") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(url) => Ok(url),
                    other => Err(invalid(
                        source,
                        format!("'mixin' entries must be strings, found {other}"),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(invalid(source, format!("'mixin' must be a list, found {other}")));
            }
        };

        Ok(Self {
            parent,
            mixin,
            fields: object,
            source: source.to_path_buf(),
        })
    }

    /// Parses artifact file content of the given form.
    pub fn parse(content: &str, form: ArtifactForm, source: &Path) -> Result<Self, RouterError> {
        let value = match form {
            ArtifactForm::Plain => serde_json::from_str::<Value>(content)?,
            ArtifactForm::Module => {
                let mut table: toml::Table = toml::from_str(content)?;
                let export = table
                    .remove("default")
                    .ok_or_else(|| invalid(source, "module artifact has no [default] export"))?;
                serde_json::to_value(export)?
            }
        };

        match value {
            Value::Object(object) => Self::from_object(object, source),
            other => Err(invalid(source, format!("expected an object, found {other}"))),
        }
    }
}

fn invalid(source: &Path, reason: impl Into<String>) -> RouterError {
    RouterError::InvalidArtifact {
        path: source.display().to_string(),
        reason: reason.into(),
    }
}
