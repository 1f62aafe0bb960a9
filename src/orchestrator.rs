//! Batch resolution with per-source failure isolation.
//!
//! Every source is resolved on its own Tokio task. A task that panics is
//! logged and left out of the batch; all other sources still come back, in
//! the order they were requested rather than the order they finished.

use crate::cache::Cache;
use crate::error::AggregatorError;
use crate::models::{BatchResponse, ResolvedSource, Source};
use crate::registry::{SourceGroup, SourceRegistry};
use crate::resolver::SourceResolver;
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

pub struct Orchestrator {
    registry: Arc<SourceRegistry>,
    resolver: Arc<SourceResolver>,
}

impl Orchestrator {
    pub fn new(registry: Arc<SourceRegistry>, resolver: Arc<SourceResolver>) -> Self {
        Self { registry, resolver }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<Cache> {
        self.resolver.cache()
    }

    fn spawn(&self, source: Source, force_refresh: bool) -> JoinHandle<ResolvedSource> {
        let resolver = Arc::clone(&self.resolver);
        tokio::spawn(async move { resolver.resolve(&source, force_refresh).await })
    }

    /// Resolve `sources` concurrently and return the ones that completed.
    ///
    /// # Arguments
    ///
    /// * `sources` - sources to resolve; output keeps this order
    /// * `force_refresh` - bypass cached entries for these sources
    ///
    /// # Returns
    ///
    /// One [`ResolvedSource`] per source whose resolution did not panic.
    #[instrument(level = "info", skip_all, fields(count = sources.len(), force_refresh))]
    pub async fn resolve_all(&self, sources: Vec<Source>, force_refresh: bool) -> Vec<ResolvedSource> {
        let requested = sources.len();
        let (ids, handles): (Vec<String>, Vec<_>) = sources
            .into_iter()
            .map(|source| (source.id.clone(), self.spawn(source, force_refresh)))
            .unzip();

        let resolved: Vec<ResolvedSource> = join_all(handles)
            .await
            .into_iter()
            .zip(ids)
            .filter_map(|(outcome, source_id)| match outcome {
                Ok(resolved) => Some(resolved),
                Err(e) => {
                    warn!(%source_id, error = %e, "Source resolution failed; omitted from batch");
                    None
                }
            })
            .collect();

        info!(requested, resolved = resolved.len(), "Batch resolved");
        resolved
    }

    /// Resolve a single source by id.
    ///
    /// # Errors
    ///
    /// - [`AggregatorError::SourceNotFound`] if no configured source has `id`
    /// - [`AggregatorError::TaskFailed`] if resolution panicked
    #[instrument(level = "info", skip(self))]
    pub async fn resolve_one(&self, id: &str, force_refresh: bool) -> Result<ResolvedSource, AggregatorError> {
        let source = self
            .registry
            .find(id)
            .cloned()
            .ok_or_else(|| AggregatorError::SourceNotFound(id.to_string()))?;

        self.spawn(source, force_refresh)
            .await
            .map_err(|e| AggregatorError::TaskFailed {
                source_id: id.to_string(),
                reason: e.to_string(),
            })
    }

    /// Resolve one dashboard group into a batch envelope.
    ///
    /// A refresh of `News` or `Social` drops only that group's cache entries;
    /// a refresh of `All` clears the whole cache.
    pub async fn resolve_group(&self, group: SourceGroup, force_refresh: bool) -> BatchResponse {
        let sources: Vec<Source> = self.registry.group(group).into_iter().cloned().collect();
        if force_refresh {
            self.invalidate(group).await;
        }
        BatchResponse::new(self.resolve_all(sources, force_refresh).await)
    }

    /// Resolve an explicit list of source ids into a batch envelope.
    pub async fn resolve_ids<S: AsRef<str>>(
        &self,
        ids: &[S],
        force_refresh: bool,
    ) -> Result<BatchResponse, AggregatorError> {
        let sources: Vec<Source> = self.registry.select(ids)?.into_iter().cloned().collect();
        Ok(BatchResponse::new(self.resolve_all(sources, force_refresh).await))
    }

    /// Drop cached entries for `group`.
    pub async fn invalidate(&self, group: SourceGroup) {
        let cache = self.cache();
        match group {
            SourceGroup::All => cache.invalidate_all().await,
            _ => {
                for source in self.registry.group(group) {
                    cache.invalidate(&source.id).await;
                }
            }
        }
        info!(%group, "Cache invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;
    use crate::resolver::tests::{quick_settings, rss_feed, source};
    use chrono::Utc;
    use std::time::Duration;

    fn orchestrator(stub: Arc<StubFetcher>, registry: SourceRegistry) -> Orchestrator {
        let cache = Arc::new(Cache::new(Duration::from_secs(180)));
        let resolver = Arc::new(SourceResolver::new(stub, cache, quick_settings()));
        Orchestrator::new(Arc::new(registry), resolver)
    }

    fn fixture() -> (Arc<StubFetcher>, SourceRegistry) {
        let good = rss_feed(&[("Good story", "https://pub.test/good", Utc::now())]);
        let social = rss_feed(&[("Viral", "https://pub.test/viral", Utc::now())]);
        let stub = Arc::new(
            StubFetcher::new()
                .with_page("https://good.test/rss", &good)
                .with_page("https://social.test/rss", &social)
                .with_panic("https://boom.test/rss")
                .with_failure("https://dead.test/rss"),
        );
        let registry = SourceRegistry {
            news: vec![
                source("boom", &["https://boom.test/rss"]),
                source("good", &["https://good.test/rss"]),
                source("dead", &["https://dead.test/rss"]),
            ],
            social: vec![source("social", &["https://social.test/rss"]).on_platform("x")],
        };
        (stub, registry)
    }

    #[tokio::test]
    async fn test_panicking_source_is_omitted_from_batch() {
        let (stub, registry) = fixture();
        let orchestrator = orchestrator(stub, registry);

        let batch = orchestrator.resolve_group(SourceGroup::News, false).await;
        assert!(batch.success);
        let ids: Vec<&str> = batch.data.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids, vec!["good", "dead"]);
        assert_eq!(batch.data[0].articles.len(), 1);
        assert!(batch.data[1].articles.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_one_outcomes() {
        let (stub, registry) = fixture();
        let orchestrator = orchestrator(stub, registry);

        assert!(matches!(
            orchestrator.resolve_one("missing", false).await,
            Err(AggregatorError::SourceNotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            orchestrator.resolve_one("boom", false).await,
            Err(AggregatorError::TaskFailed { source_id, .. }) if source_id == "boom"
        ));

        let dead = orchestrator.resolve_one("dead", false).await.unwrap();
        assert!(dead.articles.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_one_is_idempotent_within_ttl() {
        let (stub, registry) = fixture();
        let orchestrator = orchestrator(stub.clone(), registry);

        let first = orchestrator.resolve_one("good", false).await.unwrap();
        let calls = stub.total_calls();
        let second = orchestrator.resolve_one("good", false).await.unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(stub.total_calls(), calls);

        orchestrator.resolve_one("good", true).await.unwrap();
        assert_eq!(stub.call_count("https://good.test/rss"), 2);
    }

    #[tokio::test]
    async fn test_group_refresh_only_invalidates_that_group() {
        let (stub, registry) = fixture();
        let orchestrator = orchestrator(stub.clone(), registry);

        orchestrator.resolve_group(SourceGroup::News, false).await;
        orchestrator.resolve_group(SourceGroup::Social, false).await;
        assert!(orchestrator.cache().get("good").await.is_some());

        let batch = orchestrator.resolve_group(SourceGroup::Social, true).await;
        assert_eq!(batch.data[0].platform.as_deref(), Some("x"));
        assert_eq!(stub.call_count("https://social.test/rss"), 2);
        assert_eq!(stub.call_count("https://good.test/rss"), 1);
        assert!(orchestrator.cache().get("good").await.is_some());

        orchestrator.invalidate(SourceGroup::All).await;
        assert!(orchestrator.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_resolve_ids_keeps_requested_order() {
        let (stub, registry) = fixture();
        let orchestrator = orchestrator(stub, registry);

        let batch = orchestrator.resolve_ids(&["social", "good"], false).await.unwrap();
        let ids: Vec<&str> = batch.data.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids, vec!["social", "good"]);

        assert!(matches!(
            orchestrator.resolve_ids(&["nope"], false).await,
            Err(AggregatorError::SourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let orchestrator = orchestrator(Arc::new(StubFetcher::new()), SourceRegistry::default());
        let batch = orchestrator.resolve_group(SourceGroup::All, true).await;
        assert!(batch.success);
        assert!(batch.data.is_empty());
    }
}
