//! HTTP access for feeds and publisher pages.
//!
//! Every network call in the crate goes through the [`Fetcher`] trait so the
//! pipeline can run against canned responses in tests. The production
//! implementation, [`HttpFetcher`], wraps a shared `reqwest::Client` that
//! follows redirects and applies a per-request timeout.
//!
//! A non-success status is *not* an error at this layer: the link resolver
//! needs the final URL of a redirect chain even when the landing page
//! answers 4xx. Callers that need a 2xx use [`FetchedPage::into_success`].

use crate::error::FetchError;
use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT};
use reqwest::{Client, redirect};
use std::time::Duration;
use tracing::{debug, instrument};

/// Desktop Chrome identity used for feed fetches and link resolution.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// `Accept` header for syndication feeds.
pub const FEED_ACCEPT: &str = "application/rss+xml, application/xml, text/xml, */*";

/// `Accept` header for HTML pages.
pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml";

const MAX_REDIRECTS: usize = 10;

/// One outbound GET.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub accept: &'static str,
    /// Send the extra headers a real browser sends on navigation.
    pub browser_headers: bool,
    /// Stop reading the body after this many bytes.
    pub max_bytes: Option<usize>,
}

impl FetchRequest {
    /// A feed request with the browser identity and feed `Accept` header.
    pub fn feed(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept: FEED_ACCEPT,
            browser_headers: false,
            max_bytes: None,
        }
    }

    /// An HTML page request with the browser identity.
    pub fn page(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            accept: HTML_ACCEPT,
            ..Self::feed(url, timeout)
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_browser_headers(mut self) -> Self {
        self.browser_headers = true;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }
}

/// The outcome of a GET after redirects were followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL of the last hop in the redirect chain.
    pub final_url: String,
    pub status: u16,
    /// Body decoded lossily as UTF-8, possibly cut at `max_bytes`.
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx page into a [`FetchError::Status`].
    pub fn into_success(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                url: self.final_url,
                status: self.status,
            })
        }
    }
}

/// Anything that can perform a GET and report where it landed.
///
/// Implementations must be shareable across concurrently running source
/// resolutions.
pub trait Fetcher: Send + Sync {
    fn get(&self, request: FetchRequest) -> BoxFuture<'_, Result<FetchedPage, FetchError>>;
}

/// `reqwest`-backed [`Fetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an already-configured client (proxies, custom TLS, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    #[instrument(level = "debug", skip_all, fields(url = %request.url))]
    async fn send(&self, request: FetchRequest) -> Result<FetchedPage, FetchError> {
        let mut builder = self
            .client
            .get(&request.url)
            .timeout(request.timeout)
            .header(USER_AGENT, request.user_agent.as_str())
            .header(ACCEPT, request.accept);

        if request.browser_headers {
            builder = builder
                .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                .header(CACHE_CONTROL, "no-cache")
                .header("Upgrade-Insecure-Requests", "1")
                .header("Sec-Fetch-Dest", "document")
                .header("Sec-Fetch-Mode", "navigate")
                .header("Sec-Fetch-Site", "none");
        }

        let mut response = builder
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&request.url, e))?;

        let final_url = response.url().to_string();
        let status = response.status().as_u16();

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::from_reqwest(&request.url, e))?
        {
            body.extend_from_slice(&chunk);
            if let Some(max) = request.max_bytes {
                if body.len() >= max {
                    body.truncate(max);
                    break;
                }
            }
        }

        debug!(%final_url, status, bytes = body.len(), "Fetched");
        Ok(FetchedPage {
            final_url,
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, request: FetchRequest) -> BoxFuture<'_, Result<FetchedPage, FetchError>> {
        Box::pin(self.send(request))
    }
}
