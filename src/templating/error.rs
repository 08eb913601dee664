//! Template evaluation errors
//!
//! Structured errors for the Tera evaluator with the location of the failure
//! (provider id, field, line) and a user-facing report.

/// Template evaluation errors with location details
#[derive(Debug)]
pub enum TemplateError {
    /// No template layer matched the URL, not even at a layer root
    MissingTemplate {
        url: String,
    },

    /// The entrypoint field exists nowhere in the template chain or context
    EntrypointNotFound {
        entrypoint: String,
        providers: Box<Vec<String>>,
    },

    VariableNotFound {
        variable: String,
        available_variables: Box<Vec<String>>,
        suggestions: Box<Vec<String>>,
        location: Box<ErrorLocation>,
    },

    SyntaxError {
        message: String,
        location: Box<ErrorLocation>,
    },
}

/// Where a template error occurred
#[derive(Debug, Clone, Default)]
pub struct ErrorLocation {
    /// Id of the provider holding the rendered field
    pub provider: String,
    /// Rendered field name
    pub field: String,
    /// Line number if available from Tera
    pub line_number: Option<usize>,
    /// Lines around the error, 1-indexed
    pub context_lines: Option<Vec<(usize, String)>>,
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::MissingTemplate {
                url,
            } => {
                write!(f, "No template provider found for '{}'", url)
            }
            TemplateError::EntrypointNotFound {
                entrypoint,
                ..
            } => {
                write!(f, "Entrypoint '{}' not found", entrypoint)
            }
            TemplateError::VariableNotFound {
                variable,
                ..
            } => {
                write!(f, "Template variable not found: '{}'", variable)
            }
            TemplateError::SyntaxError {
                message,
                ..
            } => {
                write!(f, "Template syntax error: {}", message)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

impl TemplateError {
    /// Generate user-friendly error message with context and suggestions
    pub fn format_with_context(&self) -> String {
        match self {
            TemplateError::MissingTemplate {
                url,
            } => format_missing_template_error(url),
            TemplateError::EntrypointNotFound {
                entrypoint,
                providers,
            } => format_entrypoint_error(entrypoint, providers),
            TemplateError::VariableNotFound {
                variable,
                available_variables,
                suggestions,
                location,
            } => format_variable_not_found_error(
                variable,
                available_variables,
                suggestions,
                location,
            ),
            TemplateError::SyntaxError {
                message,
                location,
            } => format_syntax_error(message, location),
        }
    }
}

fn format_missing_template_error(url: &str) -> String {
    let mut msg = String::new();

    msg.push_str("ERROR: No Template Found\n\n");
    msg.push_str(&format!("URL: {}\n", url));
    msg.push_str("\nSUGGESTION: Add a template.json or template.toml to a template layer root\n");
    msg.push_str("so that every URL has a fallback template.\n");

    msg
}

fn format_entrypoint_error(entrypoint: &str, providers: &[String]) -> String {
    let mut msg = String::new();

    msg.push_str("ERROR: Entrypoint Not Found\n\n");
    msg.push_str(&format!("Entrypoint: {}\n", entrypoint));

    if !providers.is_empty() {
        msg.push_str("\nTemplate chain:\n");
        for provider in providers {
            msg.push_str(&format!("  {}\n", provider));
        }
    }

    msg.push_str(&format!("\nSUGGESTION: Define '{}' in one of the templates above.\n", entrypoint));

    msg
}

fn format_location(msg: &mut String, location: &ErrorLocation) {
    msg.push_str(&format!("Provider: {}\n", location.provider));
    msg.push_str(&format!("Field: {}\n", location.field));

    if let Some(line) = location.line_number {
        msg.push_str(&format!("Line: {}\n", line));
    }

    if let Some(lines) = &location.context_lines {
        msg.push('\n');
        for (number, line) in lines {
            let marker = if Some(*number) == location.line_number {
                ">"
            } else {
                " "
            };
            msg.push_str(&format!("{} {:>4} | {}\n", marker, number, line));
        }
    }
}

/// Format a detailed "variable not found" error message
fn format_variable_not_found_error(
    variable: &str,
    available_variables: &[String],
    suggestions: &[String],
    location: &ErrorLocation,
) -> String {
    let mut msg = String::new();

    msg.push_str("ERROR: Template Variable Not Found\n\n");
    msg.push_str(&format!("Variable: {}\n", variable));
    format_location(&mut msg, location);
    msg.push('\n');

    if !suggestions.is_empty() {
        msg.push_str("Did you mean one of these?\n");
        for suggestion in suggestions.iter() {
            msg.push_str(&format!("  - {}\n", suggestion));
        }
        msg.push('\n');
    }

    if !available_variables.is_empty() {
        msg.push_str("Available variables in this context:\n");
        for var in available_variables.iter().take(10) {
            msg.push_str(&format!("  {}\n", var));
        }
        if available_variables.len() > 10 {
            msg.push_str(&format!("  ... and {} more\n", available_variables.len() - 10));
        }
        msg.push('\n');
    }

    msg
}

/// Format syntax error
fn format_syntax_error(message: &str, location: &ErrorLocation) -> String {
    let mut msg = String::new();

    msg.push_str("ERROR: Template Syntax Error\n\n");
    msg.push_str(&format!("Error: {}\n", message));
    format_location(&mut msg, location);

    msg.push_str("\nSUGGESTION: Check template syntax for unclosed tags or invalid expressions.\n");
    msg.push_str("Common issues:\n");
    msg.push_str("  - Unclosed {{ }} or {% %} delimiters\n");
    msg.push_str("  - Invalid filter names\n");
    msg.push_str("  - Missing quotes around string values\n\n");

    msg
}
