//! Per-source resolution pipeline.
//!
//! One call to [`SourceResolver::resolve`] walks a source through:
//!
//! 1. **Cache check**: a fresh entry is returned as-is unless a refresh was forced.
//! 2. **Candidate walk**: each feed URL, in configured order, goes through the
//!    [`ParserChain`]; the first feed that yields fresh items wins. A stale
//!    feed counts as a miss and the walk moves on.
//! 3. **Retry**: if no candidate yielded any items at all, wait the backoff
//!    and walk again, up to `max_retries` times. A walk that only found stale
//!    feeds is not retried. Still empty is a valid result.
//! 4. **Enrichment**: every article is link-resolved and then image-enriched,
//!    all articles concurrently.
//! 5. **Store**: the result, empty or not, goes into the cache.
//!
//! Nothing in here returns an error: upstream failures were already turned
//! into "no items" by the stages below.

use crate::cache::Cache;
use crate::enrich::ImageEnricher;
use crate::fetch::Fetcher;
use crate::links::LinkResolver;
use crate::models::{NormalizedArticle, ResolvedSource, Source};
use crate::normalize::ArticleNormalizer;
use crate::parsers::ParserChain;
use crate::settings::ResolverSettings;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// How a walk over the candidate list ended.
enum Walk {
    Found(Vec<NormalizedArticle>),
    /// Some candidate produced items, but every such feed was stale.
    StaleOnly,
    /// No candidate produced any items.
    Empty,
}

pub struct SourceResolver {
    chain: ParserChain,
    normalizer: ArticleNormalizer,
    links: LinkResolver,
    images: ImageEnricher,
    cache: Arc<Cache>,
    settings: ResolverSettings,
}

impl SourceResolver {
    /// Production pipeline: every stage shares `fetcher`.
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<Cache>, settings: ResolverSettings) -> Self {
        let chain = ParserChain::standard(Arc::clone(&fetcher), &settings);
        let normalizer = ArticleNormalizer::new(settings.max_articles, settings.stale_after);
        let links = LinkResolver::new(
            Arc::clone(&fetcher),
            settings.link_timeout,
            settings.link_scan_bytes,
        );
        let images = ImageEnricher::standard(fetcher, &settings);
        Self::from_parts(chain, normalizer, links, images, cache, settings)
    }

    /// Assemble a resolver from individually configured stages.
    pub fn from_parts(
        chain: ParserChain,
        normalizer: ArticleNormalizer,
        links: LinkResolver,
        images: ImageEnricher,
        cache: Arc<Cache>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            chain,
            normalizer,
            links,
            images,
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Resolve `source` into at most `max_articles` enriched articles.
    ///
    /// # Arguments
    ///
    /// * `source` - the source to resolve
    /// * `force_refresh` - skip the cache lookup (the result is still stored)
    ///
    /// # Returns
    ///
    /// The cached or freshly built [`ResolvedSource`]. An empty article list
    /// means every candidate feed failed or was stale on every attempt.
    #[instrument(level = "info", skip_all, fields(source_id = %source.id, force_refresh))]
    pub async fn resolve(&self, source: &Source, force_refresh: bool) -> ResolvedSource {
        if !force_refresh {
            if let Some(cached) = self.cache.get(&source.id).await {
                return cached;
            }
        }

        let mut articles = Vec::new();
        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                warn!(
                    attempt,
                    backoff_ms = self.settings.retry_backoff.as_millis() as u64,
                    "No candidate feed produced articles; retrying"
                );
                tokio::time::sleep(self.settings.retry_backoff).await;
            }
            match self.walk_candidates(source).await {
                Walk::Found(found) => {
                    articles = found;
                    break;
                }
                Walk::StaleOnly => {
                    info!("Every reachable candidate feed is stale; not retrying");
                    break;
                }
                Walk::Empty => {}
            }
        }

        self.enrich_all(&mut articles).await;

        let resolved = ResolvedSource::from_source(source, articles, Utc::now());
        self.cache.put(resolved.clone()).await;
        info!(count = resolved.articles.len(), "Source resolved");
        resolved
    }

    /// Try each candidate URL in order; the first fresh, non-empty feed wins.
    async fn walk_candidates(&self, source: &Source) -> Walk {
        let mut saw_stale = false;
        for url in source.feeds.iter().filter(|url| !url.trim().is_empty()) {
            let Some(items) = self.chain.run(url).await else {
                debug!(%url, "Candidate feed produced no items");
                continue;
            };
            match self.normalizer.normalize(items, Utc::now()) {
                Some(articles) if !articles.is_empty() => {
                    debug!(%url, count = articles.len(), "Candidate feed accepted");
                    return Walk::Found(articles);
                }
                Some(_) => debug!(%url, "Candidate feed normalized to nothing"),
                None => {
                    info!(%url, "Candidate feed is stale; skipping");
                    saw_stale = true;
                }
            }
        }
        if saw_stale { Walk::StaleOnly } else { Walk::Empty }
    }

    /// Link resolution then image enrichment, per article, all articles at once.
    async fn enrich_all(&self, articles: &mut [NormalizedArticle]) {
        join_all(articles.iter_mut().map(|article| async move {
            self.links.resolve(article).await;
            self.images.enrich(article).await;
        }))
        .await;
    }
}
