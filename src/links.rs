//! Aggregator redirect resolution.
//!
//! Search-proxy feeds hand out `news.google.com` tracking links. Following one
//! usually lands on the publisher; sometimes it lands on a thumbnail or a
//! consent interstitial instead. [`LinkResolver::resolve`] handles all three
//! outcomes and harvests a thumbnail along the way when the article has none.
//!
//! | Landing page | Link | Image (only when unset) |
//! |---|---|---|
//! | aggregator image host | unchanged | the landing URL |
//! | publisher page | landing URL | page `og:image` |
//! | aggregator interstitial | first publisher URL in the page | aggregator-hosted thumbnail |
//!
//! Harvested images are resolved against the landing URL; anything that is
//! not http(s) afterwards is dropped. Network failures leave the article
//! untouched.

use crate::fetch::{FetchRequest, Fetcher};
use crate::models::NormalizedArticle;
use crate::normalize::absolutize_image;
use crate::scan::{
    AGGREGATOR_IMAGE_DOMAIN, aggregator_thumbnail, is_aggregator_link, is_aggregator_owned,
    is_image_file, og_image, publisher_url,
};
use crate::utils::head;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct LinkResolver {
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
    scan_bytes: usize,
}

impl LinkResolver {
    /// # Arguments
    ///
    /// * `timeout` - deadline for the whole redirect chain
    /// * `scan_bytes` - how much of a publisher page is searched for `og:image`
    pub fn new(fetcher: Arc<dyn Fetcher>, timeout: Duration, scan_bytes: usize) -> Self {
        Self {
            fetcher,
            timeout,
            scan_bytes,
        }
    }

    /// Follow an aggregator link in place. Non-aggregator links are ignored.
    #[instrument(level = "debug", skip_all, fields(link = %article.link))]
    pub async fn resolve(&self, article: &mut NormalizedArticle) {
        if !is_aggregator_link(&article.link) {
            return;
        }

        let page = match self
            .fetcher
            .get(FetchRequest::page(article.link.as_str(), self.timeout))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                debug!(error = %e, "Aggregator link not resolved");
                return;
            }
        };

        let landed = page.final_url.as_str();

        if landed.contains(AGGREGATOR_IMAGE_DOMAIN) {
            if article.image.is_none() {
                article.image = Some(landed.to_string());
            }
            return;
        }

        if !is_aggregator_owned(landed) && !is_image_file(landed) {
            debug!(publisher = %landed, "Aggregator link redirected to publisher");
            article.link = landed.to_string();
            if article.image.is_none() {
                article.image = og_image(head(&page.body, self.scan_bytes))
                    .and_then(|image| absolutize_image(&image, landed));
            }
            return;
        }

        if let Some(url) = publisher_url(&page.body) {
            debug!(publisher = %url, "Publisher URL found on interstitial");
            article.link = url;
        }
        if article.image.is_none() {
            article.image = aggregator_thumbnail(&page.body)
                .and_then(|image| absolutize_image(&image, landed));
        }
    }
}
