//! fsroute CLI entry point
//!
//! Parses arguments, runs the command, and renders errors with suggestions.
//!
//! - `render` - Render a URL with the built-in Tera evaluator
//! - `resolve` - Print the provider chain for a URL
//! - `index` - List indexed artifact paths per layer

use anyhow::Result;
use clap::Parser;
use fsroute::cli;
use fsroute::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
