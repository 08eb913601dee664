//! fsroute - layered filesystem template router
//!
//! Resolves a logical resource path ("URL") to a chain of rendering artifacts
//! ("providers") assembled from several priority-ordered directory trees, and
//! hands the result to an evaluator.
//!
//! # Architecture Overview
//!
//! Every layer is a directory tree. At any sub-path a layer may hold a
//! `template.json` / `template.toml` and a `context.json` / `context.toml`
//! artifact. Rendering `blog/post` works as follows:
//!
//! - every layer looks up the deepest ancestor of `blog/post` holding an
//!   artifact (`blog/post`, then `blog`, then the layer root),
//! - the deepest match across all layers wins; equally deep matches are
//!   chained in layer order,
//! - `mixin` lists merge fields from other artifacts of the same layer,
//! - a `parent` URL appends that URL's resolved chain,
//! - template and context chains are resolved concurrently and passed, with a
//!   call context, to an [`router::Evaluator`].
//!
//! ## Key Features
//!
//! - **Override by depth**: a more specific path beats layer priority
//! - **Two index modes**: on-demand probing (hot update) or an index built once at startup
//! - **Cycle detection**: for `parent` chains and for mixins
//! - **Cross-layer lookups**: artifacts can render the next layer's version of themselves
//!
//! # Core Modules
//!
//! - [`core`] - Error types, artifacts, and providers
//! - [`index`] - Per-layer path index and artifact loading
//! - [`resolver`] - Chain resolution, mixin merging, and parent layer search
//! - [`router`] - The orchestrator and the evaluator boundary
//! - [`templating`] - Built-in Tera evaluator
//! - [`config`] - TOML configuration file
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```text
//! theme/blog/template.json   { "main": "<theme>{{ parentLayer(id=\"blog/t@t-theme\") }}</theme>" }
//! app/template.json          { "main": "{{ title }}" }
//! app/blog/template.json     { "main": "<h1>{{ title }}</h1>" }
//! app/blog/context.json      { "title": "Blog" }
//! ```
//!
//! ```bash
//! fsroute resolve blog/post      # blog/t@t-theme, blog/t@t-app
//! fsroute render blog/post       # <theme><h1>Blog</h1></theme>
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod index;
pub mod resolver;
pub mod router;
pub mod templating;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
