//! Horizontal composition: merging mixin artifacts into a provider.
//!
//! Mixins are looked up with [`PathIndex::lookup_exact`] in the layer that owns
//! the provider, never in another layer and never at a shorter ancestor path.
//! Every non-reserved field of a mixin is copied onto the provider; a field that
//! already exists (from the artifact itself or an earlier mixin) is a
//! [`RouterError::MixinCollision`]. A mixin's own `mixin` list is merged right
//! after the mixin itself.

use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use serde_json::{Map, Value};

use crate::core::{RESERVED_FIELDS, Result, RouterError};
use crate::index::{PathIndex, normalize_url};

/// Merges mixins from one layer's index.
#[derive(Debug, Clone, Copy)]
pub struct MixinMerger<'a> {
    index: &'a PathIndex,
}

impl<'a> MixinMerger<'a> {
    /// Creates a merger bound to the provider's own layer and kind.
    #[must_use]
    pub const fn new(index: &'a PathIndex) -> Self {
        Self {
            index,
        }
    }

    /// Merges `mixins` (and, recursively, their mixins) into `fields`.
    ///
    /// `provider_id` is only used in error messages.
    pub async fn merge(
        &self,
        provider_id: &str,
        fields: &mut Map<String, Value>,
        mixins: &[String],
    ) -> Result<()> {
        let mut trail = Vec::new();
        self.merge_level(provider_id, fields, mixins, &mut trail).await
    }

    fn merge_level<'b>(
        &'b self,
        provider_id: &'b str,
        fields: &'b mut Map<String, Value>,
        mixins: &'b [String],
        trail: &'b mut Vec<String>,
    ) -> BoxFuture<'b, Result<()>> {
        async move {
            if mixins.is_empty() {
                return Ok(());
            }

            let directory = self.index.layer().base_dir.display().to_string();
            let sources =
                try_join_all(mixins.iter().map(|url| self.index.lookup_exact(url))).await?;

            for (url, source) in mixins.iter().zip(sources) {
                let key = normalize_url(url);
                if trail.contains(&key) {
                    let mut chain = trail.clone();
                    chain.push(key);
                    return Err(RouterError::MixinCycle {
                        provider: provider_id.to_string(),
                        chain,
                    });
                }

                let Some(source) = source else {
                    return Err(RouterError::MixinNotFound {
                        mixin: url.clone(),
                        provider: provider_id.to_string(),
                        directory,
                    });
                };

                for (name, value) in &source.artifact.fields {
                    if RESERVED_FIELDS.contains(&name.as_str()) {
                        continue;
                    }
                    if fields.contains_key(name) {
                        return Err(RouterError::MixinCollision {
                            field: name.clone(),
                            mixin: url.clone(),
                            directory,
                            provider: provider_id.to_string(),
                        });
                    }
                    fields.insert(name.clone(), value.clone());
                }

                tracing::trace!(provider = provider_id, mixin = %url, "merged mixin");

                trail.push(key);
                self.merge_level(provider_id, fields, &source.artifact.mixin, trail).await?;
                trail.pop();
            }

            Ok(())
        }
        .boxed()
    }
}
