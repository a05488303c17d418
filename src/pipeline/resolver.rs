use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::config::Config;
use crate::core::errors::RecipeError;
use crate::services::RecipeClient;

/// Maps a classifier label to a recipe id by trying candidate queries in order
pub struct RecipeResolver {
    config: Arc<Config>,
    client: Arc<RecipeClient>,
}

impl RecipeResolver {
    pub fn new(config: Arc<Config>, client: Arc<RecipeClient>) -> Self {
        Self { config, client }
    }

    /// Build the ordered candidate list for a label.
    ///
    /// The raw label goes first, then each configured template with `{label}`
    /// substituted by the spaced form (underscores and hyphens collapsed to
    /// spaces). Duplicates keep their first position.
    fn candidate_queries(&self, label: &str) -> Vec<String> {
        let raw = label.trim().to_string();
        let spaced = raw
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let mut candidates = vec![raw];
        for template in &self.config.recipes.query_templates {
            candidates.push(template.replace("{label}", &spaced));
        }

        let mut seen = HashSet::new();
        candidates.retain(|c| !c.is_empty() && seen.insert(c.clone()));
        candidates
    }

    /// Try candidate queries in order and return the first hit.
    ///
    /// `Ok(None)` means every candidate searched cleanly and came back empty.
    /// Upstream faults abort immediately so they are never reported as a miss.
    #[instrument(skip(self))]
    pub async fn resolve(&self, label: &str) -> Result<Option<u64>, RecipeError> {
        let candidates = self.candidate_queries(label);
        for (i, query) in candidates.iter().enumerate() {
            debug!("search attempt {}/{}: {:?}", i + 1, candidates.len(), query);
            let hits = self.client.search(query).await?;
            if let Some(hit) = hits.first() {
                debug!("resolved {:?} to recipe {} via {:?}", label, hit.id, query);
                return Ok(Some(hit.id));
            }
        }
        debug!("no recipe found for {:?} after {} attempts", label, candidates.len());
        Ok(None)
    }
}
