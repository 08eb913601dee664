//! Built-in Tera evaluator.
//!
//! The router itself never executes artifacts; it hands resolved chains to an
//! [`Evaluator`](crate::router::Evaluator). This module provides the one used
//! by the CLI, [`TeraEvaluator`], which treats string fields as Tera templates.
//!
//! # Variables
//!
//! A render sees every field reachable from the invocation, nearest first:
//!
//! 1. the template chain (deepest layer match first, then parents),
//! 2. the call context fields (including the requested URL under the
//!    configured `resource_path_property`),
//! 3. the context chain.
//!
//! # Functions
//!
//! - `field(name="x")`: renders field `x` as a template
//! - `parentLayer(id="x/t@theme", field="main")`: renders a field of the
//!   provider the next layer serves for `x`. The function name follows the
//!   configured `parent_layer_property`.
//! - `render(url="x", entrypoint="main")`: renders another URL through the
//!   same router. The function name follows the configured
//!   `rendering_property`.
//!
//! # Example
//!
//! `app/blog/template.json`:
//!
//! ```json
//! { "main": "<h1>{{ title }}</h1>{{ field(name=\"body\") }}", "body": "<p>{{ url }}</p>" }
//! ```
//!
//! `app/blog/context.json`:
//!
//! ```json
//! { "title": "Blog" }
//! ```
//!
//! Rendering `blog/post?page=2` yields
//! `<h1>Blog</h1><p>blog/post?page=2</p>`.

pub mod error;
mod functions;
pub mod renderer;

pub use error::{ErrorLocation, TemplateError};
pub use renderer::{MAX_FIELD_DEPTH, TeraEvaluator};
