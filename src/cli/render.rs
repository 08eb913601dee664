//! Render a URL through the Tera evaluator.

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::RouterConfig;
use crate::router::Router;
use crate::templating::TeraEvaluator;

/// Render a URL and print the output.
///
/// # Examples
///
/// ```bash
/// # Render the default entrypoint
/// fsroute render blog/post
///
/// # Render another field, keeping the query string in the `url` variable
/// fsroute render "blog/post?page=2" --entrypoint body
/// ```
#[derive(Parser, Debug)]
#[command(name = "render")]
pub struct RenderCommand {
    /// URL to render; a query string is passed through to the templates
    url: String,

    /// Field to render instead of the configured entrypoint
    #[arg(short, long)]
    entrypoint: Option<String>,

    /// Wrap provider output in begin/end comments
    #[arg(long)]
    debug_marks: bool,
}

impl RenderCommand {
    /// Execute the render command.
    pub async fn execute(self, config: RouterConfig) -> Result<()> {
        let mut options = config.to_options();
        options.debug_marks |= self.debug_marks;

        let router = Router::new(options, TeraEvaluator::new())?;
        router.init().await.context("Failed to build router indexes")?;

        let output = router
            .render(&self.url, self.entrypoint.as_deref(), None)
            .await
            .with_context(|| format!("Failed to render '{}'", self.url))?;

        println!("{output}");
        Ok(())
    }
}
