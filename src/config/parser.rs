//! TOML file parsing with file path context.
//!
//! Read and parse failures are reported with the offending path:
//!
//! ```text
//! Failed to parse config file: /srv/site/fsroute.toml
//! Caused by:
//!     invalid type: string "yes", expected a boolean
//! ```

use anyhow::{Context, Result};
use std::path::Path;

/// Parse a TOML file into any `DeserializeOwned` type.
///
/// # Examples
///
/// ```rust,no_run
/// use fsroute::config::{RouterConfig, parse_config};
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let config: RouterConfig = parse_config(Path::new("fsroute.toml"))?;
/// println!("{} template layers", config.template_layers.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or does not
/// match the shape of `T`.
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}
