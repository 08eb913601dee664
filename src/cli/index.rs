//! List every artifact path a precomputed index holds.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use crate::config::RouterConfig;
use crate::core::ArtifactKind;
use crate::router::Router;
use crate::templating::TeraEvaluator;

/// Build the indexes and print the indexed paths per layer.
///
/// Indexes are always precomputed for this command, whatever `hot_update` says.
///
/// # Examples
///
/// ```bash
/// fsroute index
/// fsroute index --kind context
/// ```
#[derive(Parser, Debug)]
#[command(name = "index")]
pub struct IndexCommand {
    /// Only list layers of this kind
    #[arg(short, long)]
    kind: Option<ArtifactKind>,
}

impl IndexCommand {
    /// Execute the index command.
    pub async fn execute(self, config: RouterConfig) -> Result<()> {
        let options = config.to_options().with_hot_update(false);
        let router = Router::new(options, TeraEvaluator::new())?;
        router.init().await.context("Failed to build router indexes")?;

        let kinds = match self.kind {
            Some(kind) => vec![kind],
            None => vec![ArtifactKind::Template, ArtifactKind::Context],
        };

        for kind in kinds {
            for index in router.layers(kind).indexes() {
                let layer = index.layer();
                println!("{} {} ({})", kind.to_string().bold(), layer.id.green(), layer.base_dir.display());
                for path in index.indexed_paths().unwrap_or_default() {
                    let shown = if path.is_empty() {
                        "/"
                    } else {
                        path.as_str()
                    };
                    println!("  {shown}");
                }
            }
        }
        Ok(())
    }
}
