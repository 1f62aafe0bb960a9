//! Preview-image recovery for articles that still have no image.
//!
//! [`ImageEnricher`] runs a list of [`ImageProvider`]s in order and keeps the
//! first image any of them finds. The standard list is:
//!
//! 1. [`BrowserProfileScraper`]: one fetch with a full browser header set and a
//!    randomly chosen desktop identity, the path least likely to be blocked.
//! 2. [`MetaTagScraper`]: the same scan under a rotation of crawler identities
//!    that publishers usually serve preview tags to.
//! 3. [`ScreenshotFallback`]: a third-party screenshot thumbnail of the page
//!    (optional, see [`ResolverSettings::screenshot_fallback`]).
//!
//! Every provider is best effort. A provider that fails yields `None` and the
//! next one is tried; when all fail the article keeps a null image.

use crate::fetch::{FetchRequest, Fetcher};
use crate::models::NormalizedArticle;
use crate::normalize::absolutize_image;
use crate::scan::{is_aggregator_owned, preview_image};
use crate::settings::ResolverSettings;
use crate::utils::head;
use futures::future::BoxFuture;
use rand::{Rng, rng};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Screenshot service prefix; the article URL is appended as-is.
pub const SCREENSHOT_SERVICE: &str = "https://image.thum.io/get/width/600/crop/400/noanimate/";

/// Desktop browser identities for the browser-profile fetch.
const BROWSER_PROFILES: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
];

/// Identities tried in order by [`MetaTagScraper`].
pub const CRAWLER_IDENTITIES: &[&str] = &[
    "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)",
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// A single way of finding a preview image for a page.
pub trait ImageProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Find an image for the page at `link`. Never fails; absence is `None`.
    fn find_image<'a>(&'a self, link: &'a str) -> BoxFuture<'a, Option<String>>;
}

/// Scans a page fetched with a randomized desktop browser profile.
pub struct BrowserProfileScraper {
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
    scan_bytes: usize,
}

impl BrowserProfileScraper {
    pub fn new(fetcher: Arc<dyn Fetcher>, timeout: Duration, scan_bytes: usize) -> Self {
        Self {
            fetcher,
            timeout,
            scan_bytes,
        }
    }

    async fn scrape(&self, link: &str) -> Option<String> {
        let profile = BROWSER_PROFILES[rng().random_range(0..BROWSER_PROFILES.len())];
        let request = FetchRequest::page(link, self.timeout)
            .with_user_agent(profile)
            .with_browser_headers()
            .with_max_bytes(self.scan_bytes);

        match self.fetcher.get(request).await {
            // Redirect statuses count as reachable; the client already followed them.
            Ok(page) if (200..400).contains(&page.status) => {
                preview_image(head(&page.body, self.scan_bytes))
                    .and_then(|image| absolutize_image(&image, &page.final_url))
            }
            Ok(page) => {
                debug!(%link, status = page.status, "Browser-profile fetch refused");
                None
            }
            Err(e) => {
                debug!(%link, error = %e, "Browser-profile fetch failed");
                None
            }
        }
    }
}

impl ImageProvider for BrowserProfileScraper {
    fn name(&self) -> &'static str {
        "browser-profile"
    }

    fn find_image<'a>(&'a self, link: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(self.scrape(link))
    }
}

/// Scans a page under each of [`CRAWLER_IDENTITIES`] in turn.
///
/// Failed or non-2xx fetches move on to the next identity. The first identity
/// that gets a 2xx page ends the rotation, image or not: a page served in full
/// that carries no preview tag will not grow one for another crawler.
pub struct MetaTagScraper {
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
    scan_bytes: usize,
}

impl MetaTagScraper {
    pub fn new(fetcher: Arc<dyn Fetcher>, timeout: Duration, scan_bytes: usize) -> Self {
        Self {
            fetcher,
            timeout,
            scan_bytes,
        }
    }

    async fn scrape(&self, link: &str) -> Option<String> {
        for identity in CRAWLER_IDENTITIES {
            let request = FetchRequest::page(link, self.timeout)
                .with_user_agent(*identity)
                .with_max_bytes(self.scan_bytes);

            match self.fetcher.get(request).await {
                Ok(page) if page.is_success() => {
                    return preview_image(head(&page.body, self.scan_bytes))
                        .and_then(|image| absolutize_image(&image, &page.final_url));
                }
                Ok(page) => debug!(%link, status = page.status, identity, "Identity refused"),
                Err(e) => debug!(%link, error = %e, identity, "Identity fetch failed"),
            }
        }
        None
    }
}

impl ImageProvider for MetaTagScraper {
    fn name(&self) -> &'static str {
        "meta-tags"
    }

    fn find_image<'a>(&'a self, link: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(self.scrape(link))
    }
}

/// Builds a screenshot-thumbnail URL without any network call.
pub struct ScreenshotFallback;

impl ScreenshotFallback {
    /// Thumbnail URL for `link`, or `None` when it is not a valid absolute URL.
    pub fn thumbnail_url(link: &str) -> Option<String> {
        let parsed = url::Url::parse(link).ok()?;
        matches!(parsed.scheme(), "http" | "https")
            .then(|| format!("{SCREENSHOT_SERVICE}{parsed}"))
    }
}

impl ImageProvider for ScreenshotFallback {
    fn name(&self) -> &'static str {
        "screenshot"
    }

    fn find_image<'a>(&'a self, link: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move { Self::thumbnail_url(link) })
    }
}

/// Ordered image providers applied to image-less articles.
pub struct ImageEnricher {
    providers: Vec<Box<dyn ImageProvider>>,
}

impl ImageEnricher {
    pub fn new(providers: Vec<Box<dyn ImageProvider>>) -> Self {
        Self { providers }
    }

    /// Browser profile, crawler rotation, then the screenshot fallback when enabled.
    pub fn standard(fetcher: Arc<dyn Fetcher>, settings: &ResolverSettings) -> Self {
        let mut providers: Vec<Box<dyn ImageProvider>> = vec![
            Box::new(BrowserProfileScraper::new(
                Arc::clone(&fetcher),
                settings.browser_timeout,
                settings.enrich_scan_bytes,
            )),
            Box::new(MetaTagScraper::new(
                fetcher,
                settings.enrich_timeout,
                settings.enrich_scan_bytes,
            )),
        ];
        if settings.screenshot_fallback {
            providers.push(Box::new(ScreenshotFallback));
        }
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Fill in `article.image` if it is empty and the link is a publisher page.
    ///
    /// Articles that already have an image, carry the placeholder link, or
    /// still point at the aggregator are left alone. A provider answer that
    /// does not resolve to an http(s) URL against the link counts as a miss.
    #[instrument(level = "debug", skip_all, fields(link = %article.link))]
    pub async fn enrich(&self, article: &mut NormalizedArticle) {
        if article.image.is_some() || !article.has_link() || is_aggregator_owned(&article.link) {
            return;
        }

        for provider in &self.providers {
            let found = provider
                .find_image(&article.link)
                .await
                .and_then(|image| absolutize_image(&image, &article.link));
            if let Some(image) = found {
                debug!(provider = provider.name(), %image, "Image recovered");
                article.image = Some(image);
                return;
            }
        }
        debug!("No image recovered");
    }
}
