//! Tera-backed evaluator.
//!
//! [`TeraEvaluator`] renders the entrypoint field of a resolved template
//! chain. String fields are Tera templates; every field reachable from the
//! invocation (template chain, call context, context chain, nearest first) is
//! available as a variable.
//!
//! Nested renders (`field()`, the parent layer function, and renders of other
//! URLs) share one depth counter, so self-referencing templates fail with an
//! error instead of recursing forever.

use futures::FutureExt;
use futures::future::BoxFuture;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera};

use super::error::{ErrorLocation, TemplateError};
use super::functions;
use crate::core::{Result, RouterError};
use crate::resolver::ParentLayerSearch;
use crate::router::{Bindings, Evaluator, Invocation, Router};

/// Maximum allowed Levenshtein distance as a percentage of target length for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Limit for nested `field()`, parent layer and URL renders.
pub const MAX_FIELD_DEPTH: usize = 16;

/// Everything a template render can see.
#[derive(Debug, Clone)]
pub(crate) struct RenderScope {
    pub fields: Map<String, Value>,
    pub entrypoint: String,
    pub parent_layer: ParentLayerSearch,
    pub bindings: Bindings,
    pub debug_marks: bool,
    pub router: Router<TeraEvaluator>,
}

/// Renders a field value: strings through Tera, anything else as JSON text.
pub(crate) fn render_value(scope: &Arc<RenderScope>, value: &Value, depth: usize) -> tera::Result<String> {
    let source = match value {
        Value::String(source) => source,
        Value::Null => return Ok(String::new()),
        other => return Ok(other.to_string()),
    };

    if depth >= MAX_FIELD_DEPTH {
        return Err(tera::Error::msg(format!("Field rendering exceeded maximum depth of {MAX_FIELD_DEPTH}")));
    }

    // Fresh Tera instance per render: functions capture this scope
    let mut tera = Tera::default();
    tera.register_function("field", functions::create_field_function(Arc::clone(scope), depth + 1));
    tera.register_function(
        &scope.bindings.parent_layer,
        functions::create_parent_layer_function(Arc::clone(scope), depth + 1),
    );
    tera.register_function(
        &scope.bindings.rendering,
        functions::create_render_function(Arc::clone(scope), depth + 1),
    );

    let mut context = TeraContext::new();
    for (name, value) in &scope.fields {
        context.insert(name.as_str(), value);
    }

    tera.render_str(source, &context)
}

/// Wraps output in begin/end markers naming the provider.
pub(crate) fn mark(enabled: bool, id: &str, rendered: String) -> String {
    if enabled {
        format!("<!-- begin: {id} -->{rendered}<!-- end: {id} -->")
    } else {
        rendered
    }
}

/// Evaluator rendering entrypoint fields with Tera.
///
/// Inside templates:
/// - every visible field is a variable (`{{ title }}`),
/// - `field(name="x")` renders field `x` as a template,
/// - the parent layer search is a function named after
///   [`Bindings::parent_layer`]
///   (`{{ parentLayer(id="x/t@theme", field="main") }}`),
/// - rendering another URL is a function named after [`Bindings::rendering`]
///   (`{{ render(url="blog/post", entrypoint="main") }}`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TeraEvaluator;

impl TeraEvaluator {
    /// Creates the evaluator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Renders the entrypoint of `invocation`.
    ///
    /// # Errors
    ///
    /// - [`TemplateError::MissingTemplate`] if no template chain was resolved
    /// - [`TemplateError::EntrypointNotFound`] if the entrypoint is not visible
    /// - [`TemplateError::VariableNotFound`] / [`TemplateError::SyntaxError`]
    ///   for Tera failures
    pub fn render_invocation(
        &self,
        router: &Router<Self>,
        invocation: &Invocation,
    ) -> std::result::Result<String, TemplateError> {
        Self::render_at(router, invocation, 0)
    }

    /// Renders `invocation` as a nested render `depth` levels deep.
    pub(crate) fn render_at(
        router: &Router<Self>,
        invocation: &Invocation,
        depth: usize,
    ) -> std::result::Result<String, TemplateError> {
        let template = invocation.template.as_ref().ok_or_else(|| TemplateError::MissingTemplate {
            url: invocation.url.clone(),
        })?;

        let Some((holder, value)) = invocation.lookup(&invocation.entrypoint) else {
            return Err(TemplateError::EntrypointNotFound {
                entrypoint: invocation.entrypoint.clone(),
                providers: Box::new(template.chain_ids()),
            });
        };

        let scope = Arc::new(RenderScope {
            fields: invocation.visible_fields(),
            entrypoint: invocation.entrypoint.clone(),
            parent_layer: invocation.parent_layer.clone(),
            bindings: invocation.bindings.clone(),
            debug_marks: invocation.debug_marks,
            router: router.clone(),
        });

        tracing::debug!(
            url = %invocation.url,
            entrypoint = %invocation.entrypoint,
            provider = holder,
            depth,
            variables = scope.fields.len(),
            "rendering entrypoint"
        );

        let rendered = render_value(&scope, value, depth).map_err(|e| {
            Self::parse_tera_error(
                &e,
                value.as_str().unwrap_or_default(),
                &scope.fields,
                ErrorLocation {
                    provider: holder.to_string(),
                    field: invocation.entrypoint.clone(),
                    ..ErrorLocation::default()
                },
            )
        })?;

        Ok(mark(invocation.debug_marks, holder, rendered))
    }

    /// Parse a Tera error into a structured TemplateError
    fn parse_tera_error(
        error: &tera::Error,
        template_content: &str,
        fields: &Map<String, Value>,
        mut location: ErrorLocation,
    ) -> TemplateError {
        location.line_number = Self::extract_line_from_tera_error(error);
        location.context_lines = location
            .line_number
            .map(|line| Self::extract_context_lines(template_content, line, 2))
            .filter(|lines| !lines.is_empty());

        let message = Self::format_tera_error(error);
        if let Some(name) = Self::extract_variable_name(&message) {
            let available_variables: Vec<String> = fields.keys().cloned().collect();
            let suggestions = Self::find_similar_variables(&name, &available_variables);
            return TemplateError::VariableNotFound {
                variable: name,
                available_variables: Box::new(available_variables),
                suggestions: Box::new(suggestions),
                location: Box::new(location),
            };
        }

        TemplateError::SyntaxError {
            message,
            location: Box::new(location),
        }
    }

    /// Extract variable name from "Variable `foo` not found" message
    fn extract_variable_name(error_msg: &str) -> Option<String> {
        let re = Regex::new(r"Variable `([^`]+)` not found").ok()?;
        re.captures(error_msg).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
    }

    /// Find similar variable names using Levenshtein distance
    fn find_similar_variables(target: &str, available: &[String]) -> Vec<String> {
        let mut scored: Vec<_> = available.iter().map(|var| (var.clone(), levenshtein(target, var))).collect();

        scored.sort_by_key(|(_, dist)| *dist);

        scored
            .into_iter()
            .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .take(3)
            .map(|(var, _)| var)
            .collect()
    }

    /// Lines around `error_line` (1-indexed) with their line numbers.
    fn extract_context_lines(content: &str, error_line: usize, context_size: usize) -> Vec<(usize, String)> {
        let lines: Vec<&str> = content.lines().collect();
        let total_lines = lines.len();

        if error_line == 0 || error_line > total_lines {
            return Vec::new();
        }

        let start = error_line.saturating_sub(context_size + 1);
        let end = (error_line + context_size).min(total_lines);

        lines[start..end].iter().enumerate().map(|(idx, line)| (start + idx + 1, (*line).to_string())).collect()
    }

    /// Extract line number from Tera error message ("1:7", "15:23")
    fn extract_line_from_tera_error(error: &tera::Error) -> Option<usize> {
        let error_msg = format!("{:?}", error);
        let re = Regex::new(r"(\d+):(\d+)").ok()?;
        re.captures(&error_msg).and_then(|caps| caps.get(1)).and_then(|m| m.as_str().parse::<usize>().ok())
    }

    /// Flattens a Tera error chain into one message without internal template names.
    pub fn format_tera_error(error: &tera::Error) -> String {
        use std::error::Error;

        let mut all_messages = vec![error.to_string()];
        let mut current_error: Option<&dyn Error> = error.source();
        while let Some(err) = current_error {
            all_messages.push(err.to_string());
            current_error = err.source();
        }

        let messages: Vec<String> = all_messages
            .into_iter()
            .map(|msg| {
                msg.replace("while rendering '__tera_one_off'", "")
                    .replace("Failed to render '__tera_one_off'", "Template rendering failed")
                    .replace("Failed to parse '__tera_one_off'", "Template syntax error")
                    .replace("'__tera_one_off'", "template")
                    .trim()
                    .to_string()
            })
            .filter(|cleaned| {
                !cleaned.is_empty() && cleaned != "Template rendering failed" && cleaned != "Template syntax error"
            })
            .collect();

        if messages.is_empty() {
            "Template syntax error (see details above)".to_string()
        } else {
            messages.join("\n  → ")
        }
    }
}

impl Evaluator for TeraEvaluator {
    type Output = String;

    fn evaluate<'a>(&'a self, router: &'a Router<Self>, invocation: Invocation) -> BoxFuture<'a, Result<String>> {
        async move {
            self.render_invocation(router, &invocation).map_err(|e| {
                tracing::debug!(url = %invocation.url, error = %e, "template evaluation failed");
                RouterError::Evaluation {
                    message: e.format_with_context(),
                }
            })
        }
        .boxed()
    }
}
