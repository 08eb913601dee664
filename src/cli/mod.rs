//! Command-line interface for fsroute.
//!
//! # Available Commands
//!
//! - `render` - Resolve a URL and render it with the built-in Tera evaluator
//! - `resolve` - Print the provider chain a URL resolves to
//! - `index` - Build the precomputed indexes and list what they contain
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug logging
//! - `--quiet` - Disable logging
//! - `--config` - Path to the router config file (default `fsroute.toml`)
//!
//! `RUST_LOG` is respected when neither `--verbose` nor `--quiet` is given.
//!
//! # Example
//!
//! ```bash
//! fsroute --config site/fsroute.toml resolve blog/post
//! fsroute render "blog/post?page=2" --entrypoint body
//! ```

mod index;
mod render;
mod resolve;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_CONFIG_FILE, RouterConfig};

/// Runtime configuration for CLI execution.
///
/// Separates what the flags ask for from how it is applied, so tests can
/// build a configuration without touching global state.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` disables logging.
    pub log_level: Option<String>,

    /// Router config file to load.
    pub config_path: PathBuf,
}

impl CliConfig {
    /// Installs the global tracing subscriber.
    ///
    /// `RUST_LOG` overrides the default `info` level but not an explicit
    /// `--verbose`. Calling this twice is harmless.
    pub fn init_logging(&self, verbose: bool) {
        let Some(level) = &self.log_level else {
            return;
        };

        let filter = if verbose {
            EnvFilter::new(level)
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "fsroute",
    about = "Resolve and render layered filesystem templates",
    version,
    long_about = "fsroute resolves a URL to template and context provider chains assembled from \
                  priority-ordered directory layers, and renders them."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Disable logging
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the router config file
    #[arg(short, long, global = true, env = "FSROUTE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a URL
    Render(render::RenderCommand),

    /// Print the provider chain for a URL
    Resolve(resolve::ResolveCommand),

    /// List indexed artifact paths per layer
    Index(index::IndexCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translates the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        }
    }

    /// Execute with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging(self.verbose);

        let router_config = RouterConfig::load(&config.config_path)
            .with_context(|| format!("Failed to load router config from {}", config.config_path.display()))?;

        match self.command {
            Commands::Render(cmd) => cmd.execute(router_config).await,
            Commands::Resolve(cmd) => cmd.execute(router_config).await,
            Commands::Index(cmd) => cmd.execute(router_config).await,
        }
    }
}
