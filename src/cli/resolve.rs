//! Show the provider chain a URL resolves to.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use crate::config::RouterConfig;
use crate::core::ArtifactKind;
use crate::router::Router;
use crate::templating::TeraEvaluator;

/// Print the resolved provider ids for a URL, one per line, in chain order.
///
/// # Examples
///
/// ```bash
/// fsroute resolve blog/post
/// fsroute resolve blog/post --kind context
/// fsroute resolve blog/post --fields
/// ```
#[derive(Parser, Debug)]
#[command(name = "resolve")]
pub struct ResolveCommand {
    /// URL to resolve
    url: String,

    /// Artifact kind to resolve (template or context)
    #[arg(short, long, default_value = "template")]
    kind: ArtifactKind,

    /// Also print each provider's own field names
    #[arg(long)]
    fields: bool,
}

impl ResolveCommand {
    /// Execute the resolve command.
    pub async fn execute(self, config: RouterConfig) -> Result<()> {
        let router = Router::new(config.to_options(), TeraEvaluator::new())?;
        router.init().await.context("Failed to build router indexes")?;

        let chain = router
            .resolve(self.kind, &self.url)
            .await
            .with_context(|| format!("Failed to resolve {} providers for '{}'", self.kind, self.url))?;

        let Some(head) = chain else {
            eprintln!("{}", format!("No {} provider matches '{}'", self.kind, self.url).yellow());
            return Ok(());
        };

        for provider in head.chain() {
            println!("{}", provider.id());
            if self.fields {
                let mut names: Vec<&String> = provider.fields().keys().collect();
                names.sort();
                for name in names {
                    println!("  {}", name.dimmed());
                }
            }
        }
        Ok(())
    }
}
