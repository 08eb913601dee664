//! Tera functions available inside field templates.
//!
//! - `field(name="x")`: renders another visible field as a template.
//! - `<parent_layer_property>(id="x/t@layer", field="main")`: renders a field
//!   of the provider the next layer serves for the same path.
//! - `<rendering_property>(url="x", entrypoint="main")`: renders another URL
//!   through the same router.
//!
//! Tera functions are synchronous. Lookups that complete without I/O run
//! inline; the rest block the current worker thread.

use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};

use super::renderer::{RenderScope, TeraEvaluator, mark, render_value};
use crate::core::{Provider, Result, RouterError};
use crate::resolver::ParentLayerSearch;

fn string_arg<'a>(args: &'a HashMap<String, Value>, function: &str, name: &str) -> tera::Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("{function}() requires a string '{name}' argument")))
}

/// `field(name="x")`
pub(crate) fn create_field_function(scope: Arc<RenderScope>, depth: usize) -> impl tera::Function + 'static {
    move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let name = string_arg(args, "field", "name")?;
        let value = scope
            .fields
            .get(name)
            .ok_or_else(|| tera::Error::msg(format!("field '{name}' not found")))?;

        Ok(Value::String(render_value(&scope, value, depth)?))
    }
}

/// `parentLayer(id="x/t@layer", field="main")`
///
/// `field` defaults to the render's entrypoint. The field is rendered with
/// the found provider's chain in front of the current variables.
pub(crate) fn create_parent_layer_function(
    scope: Arc<RenderScope>,
    depth: usize,
) -> impl tera::Function + 'static {
    move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let function = scope.bindings.parent_layer.as_str();
        let id = string_arg(args, function, "id")?;
        let field = match args.get("field") {
            Some(_) => string_arg(args, function, "field")?,
            None => scope.entrypoint.as_str(),
        };

        let provider =
            find_parent_layer(&scope.parent_layer, id).map_err(|e| tera::Error::msg(e.to_string()))?;
        let Some((holder, value)) = provider.lookup(field) else {
            return Err(tera::Error::msg(format!(
                "field '{field}' not found in the chain of '{}'",
                provider.id()
            )));
        };

        let mut fields = Map::new();
        for source in provider.chain().map(Provider::fields).chain(std::iter::once(&scope.fields)) {
            for (name, value) in source {
                if !fields.contains_key(name) {
                    fields.insert(name.clone(), value.clone());
                }
            }
        }
        let child = Arc::new(RenderScope {
            fields,
            ..RenderScope::clone(&scope)
        });

        tracing::trace!(id, found = provider.id(), field, "rendering parent layer field");
        let rendered = render_value(&child, value, depth)?;
        Ok(Value::String(mark(scope.debug_marks, holder.id(), rendered)))
    }
}

/// `render(url="x", entrypoint="main")`
///
/// Renders `url` with a fresh call context, exactly as a top-level render
/// would, but counting towards the current nesting depth. `entrypoint`
/// defaults to the router's default, not to the current render's.
pub(crate) fn create_render_function(scope: Arc<RenderScope>, depth: usize) -> impl tera::Function + 'static {
    move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let function = scope.bindings.rendering.as_str();
        let url = string_arg(args, function, "url")?;
        let entrypoint = match args.get("entrypoint") {
            Some(_) => Some(string_arg(args, function, "entrypoint")?),
            None => None,
        };

        let invocation = block_on_ready(scope.router.invocation(url, entrypoint, None), || format!("render of '{url}'"))
            .map_err(|e| tera::Error::msg(e.to_string()))?;

        tracing::trace!(url, entrypoint = %invocation.entrypoint, depth, "rendering nested url");
        TeraEvaluator::render_at(&scope.router, &invocation, depth)
            .map(Value::String)
            .map_err(|e| tera::Error::msg(e.format_with_context()))
    }
}

/// Runs the parent layer search from synchronous template code.
fn find_parent_layer(search: &ParentLayerSearch, id: &str) -> Result<Arc<Provider>> {
    match search.find_ready(id) {
        Some(result) => result,
        None => block_on_ready(search.find(id), || format!("parent layer lookup for '{id}'")),
    }
}

/// Drives `future` to completion from synchronous code.
///
/// A future that completes on its first poll never blocks. Otherwise the
/// current worker thread is blocked, which is only possible on a
/// multi-threaded runtime; `action` names the operation in the error.
fn block_on_ready<T>(future: impl Future<Output = Result<T>>, action: impl FnOnce() -> String) -> Result<T> {
    let mut future = std::pin::pin!(future);
    if let Some(result) = future.as_mut().now_or_never() {
        return result;
    }

    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(future))
        }
        _ => Err(RouterError::Evaluation {
            message: format!(
                "{} needs filesystem access, which requires a multi-threaded runtime or precomputed indexes",
                action()
            ),
        }),
    }
}
