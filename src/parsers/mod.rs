//! Feed parse strategies and the chain that drives them.
//!
//! A candidate feed URL is handed to each strategy in a fixed order until one
//! yields at least one item. Every strategy fetches for itself and swallows
//! its own failures, so a broken strategy simply means "no items".
//!
//! # Strategies
//!
//! | Order | Module | Method | Notes |
//! |-------|--------|--------|-------|
//! | 1 | [`rss_ext`] | `rss` crate | Captures `content:encoded`, Media RSS and Dublin Core |
//! | 2 | [`xml_basic`] | `quick-xml` events | Core fields only; tolerates odd namespaces, Atom entries and mismatched tags |
//! | 3 | [`lenient`] | regex over raw markup | Last resort for markup no XML parser accepts |
//!
//! Each strategy maps its results onto [`RawFeedItem`] before returning, so
//! downstream normalization never branches on which parser ran.

pub mod lenient;
pub mod rss_ext;
pub mod xml_basic;

use crate::fetch::{FetchRequest, Fetcher};
use crate::models::RawFeedItem;
use crate::settings::ResolverSettings;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub use lenient::LenientStrategy;
pub use rss_ext::RssExtStrategy;
pub use xml_basic::BasicXmlStrategy;

/// One way of turning a feed URL into items.
pub trait FeedStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch and parse `url`. `None` or an empty list both mean "no items".
    fn items<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Option<Vec<RawFeedItem>>>;
}

/// Ordered list of strategies tried against a single feed URL.
pub struct ParserChain {
    strategies: Vec<Box<dyn FeedStrategy>>,
}

impl ParserChain {
    pub fn new(strategies: Vec<Box<dyn FeedStrategy>>) -> Self {
        Self { strategies }
    }

    /// The production chain: extended RSS, basic XML, then lenient patterns.
    pub fn standard(fetcher: Arc<dyn Fetcher>, settings: &ResolverSettings) -> Self {
        Self::new(vec![
            Box::new(RssExtStrategy::new(Arc::clone(&fetcher), settings.feed_timeout)),
            Box::new(BasicXmlStrategy::new(Arc::clone(&fetcher), settings.feed_timeout)),
            Box::new(LenientStrategy::new(
                fetcher,
                settings.feed_timeout,
                settings.lenient_item_cap,
            )),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the strategies in order; the first non-empty result wins.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn run(&self, url: &str) -> Option<Vec<RawFeedItem>> {
        for strategy in &self.strategies {
            match strategy.items(url).await {
                Some(items) if !items.is_empty() => {
                    debug!(strategy = strategy.name(), count = items.len(), "Strategy produced items");
                    return Some(items);
                }
                _ => debug!(strategy = strategy.name(), "Strategy produced no items"),
            }
        }
        None
    }
}

/// Fetch a feed body, treating any failure or non-2xx status as absent.
pub(crate) async fn fetch_feed_body(
    fetcher: &dyn Fetcher,
    url: &str,
    timeout: Duration,
) -> Option<String> {
    match fetcher
        .get(FetchRequest::feed(url, timeout))
        .await
        .and_then(|page| page.into_success())
    {
        Ok(page) => Some(page.body),
        Err(e) => {
            debug!(%url, error = %e, "Feed fetch failed");
            None
        }
    }
}

/// Keep only non-blank strings.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
