//! Tunables for the resolution pipeline.
//!
//! Defaults mirror the deployed dashboard. Tests shrink the durations so the
//! retry path runs without real sleeping.

use std::time::Duration;

/// Timeouts, bounds and toggles shared by every stage of source resolution.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Deadline for each feed fetch made by a parse strategy.
    pub feed_timeout: Duration,
    /// Deadline for following an aggregator redirect link.
    pub link_timeout: Duration,
    /// Deadline for each identity in the meta-tag rotation.
    pub enrich_timeout: Duration,
    /// Deadline for the browser-profile enrichment fetch.
    pub browser_timeout: Duration,
    /// Pause before re-walking the candidate list after a fully empty pass.
    pub retry_backoff: Duration,
    /// Whole-source retries after every candidate URL came up empty.
    pub max_retries: usize,
    /// Articles kept per source.
    pub max_articles: usize,
    /// A feed whose newest item is older than this is treated as abandoned.
    pub stale_after: chrono::Duration,
    /// Items the lenient pattern parser extracts before stopping.
    pub lenient_item_cap: usize,
    /// Bytes of a publisher page scanned for preview-image tags.
    pub enrich_scan_bytes: usize,
    /// Bytes of a redirect-resolved page scanned for `og:image`.
    pub link_scan_bytes: usize,
    /// How long a resolved source is served from cache.
    pub cache_ttl: Duration,
    /// Fall back to a page-screenshot thumbnail when no image was found.
    pub screenshot_fallback: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            feed_timeout: Duration::from_secs(10),
            link_timeout: Duration::from_secs(8),
            enrich_timeout: Duration::from_secs(5),
            browser_timeout: Duration::from_secs(8),
            retry_backoff: Duration::from_secs(2),
            max_retries: 1,
            max_articles: 5,
            stale_after: chrono::Duration::days(7),
            lenient_item_cap: 10,
            enrich_scan_bytes: 80_000,
            link_scan_bytes: 60_000,
            cache_ttl: Duration::from_secs(3 * 60),
            screenshot_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ResolverSettings::default();
        assert_eq!(settings.cache_ttl, Duration::from_secs(180));
        assert_eq!(settings.max_articles, 5);
        assert_eq!(settings.max_retries, 1);
        assert_eq!(settings.stale_after, chrono::Duration::days(7));
        assert!(settings.screenshot_fallback);
    }
}
