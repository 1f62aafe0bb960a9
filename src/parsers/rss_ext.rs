//! Strategy 1: structured RSS parse with extended fields.
//!
//! Uses the [`rss`] crate, which understands namespaced extensions. On top of
//! the core RSS fields this captures `content:encoded`, Media RSS
//! (`media:content`, `media:thumbnail`, `media:group`), Dublin Core
//! descriptions/dates and iTunes summaries.
//!
//! The `rss` crate is strict: Atom documents and feeds with broken namespace
//! declarations are rejected, which is what strategy 2 is for.

use super::{FeedStrategy, fetch_feed_body, non_blank};
use crate::fetch::Fetcher;
use crate::models::RawFeedItem;
use crate::utils::truncate_for_log;
use futures::future::BoxFuture;
use rss::extension::Extension;
use rss::{Channel, Item};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct RssExtStrategy {
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
}

impl RssExtStrategy {
    pub fn new(fetcher: Arc<dyn Fetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    async fn fetch_and_parse(&self, url: &str) -> Option<Vec<RawFeedItem>> {
        let body = fetch_feed_body(self.fetcher.as_ref(), url, self.timeout).await?;
        match parse_channel(&body) {
            Ok(items) => Some(items),
            Err(e) => {
                debug!(
                    %url,
                    error = %e,
                    preview = %truncate_for_log(&body, 200),
                    "Extended RSS parse failed"
                );
                None
            }
        }
    }
}

impl FeedStrategy for RssExtStrategy {
    fn name(&self) -> &'static str {
        "rss-extended"
    }

    fn items<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Option<Vec<RawFeedItem>>> {
        Box::pin(self.fetch_and_parse(url))
    }
}

/// Parse an RSS document into raw items.
///
/// Pure function so tests can exercise the mapping without the network.
pub fn parse_channel(xml: &str) -> Result<Vec<RawFeedItem>, rss::Error> {
    let channel = Channel::read_from(xml.as_bytes())?;
    Ok(channel.items().iter().map(map_item).collect())
}

fn map_item(item: &Item) -> RawFeedItem {
    let dublin_core = item.dublin_core_ext();
    let itunes = item.itunes_ext();
    let media = item.extensions().get("media");

    let media_url = |name: &str| {
        media
            .and_then(|m| m.get(name))
            .and_then(|list| list.iter().find_map(url_attr))
    };
    let media_group_url = media
        .and_then(|m| m.get("group"))
        .and_then(|groups| {
            groups
                .iter()
                .flat_map(|group| children_named(group, "content"))
                .find_map(url_attr)
        });

    RawFeedItem {
        title: non_blank(item.title()),
        link: non_blank(item.link()),
        content_encoded: non_blank(item.content()),
        content: None,
        summary: non_blank(itunes.and_then(|i| i.summary())),
        description: non_blank(item.description()),
        snippet: non_blank(itunes.and_then(|i| i.subtitle())),
        dc_description: non_blank(
            dublin_core.and_then(|dc| dc.descriptions().first().map(String::as_str)),
        ),
        pub_date: non_blank(item.pub_date())
            .or_else(|| non_blank(dublin_core.and_then(|dc| dc.dates().first().map(String::as_str)))),
        enclosure_url: non_blank(item.enclosure().map(|e| e.url())),
        media_content_url: media_url("content"),
        media_thumbnail_url: media_url("thumbnail"),
        media_group_url,
        scraped_images: Vec::new(),
    }
}

fn url_attr(ext: &Extension) -> Option<String> {
    non_blank(ext.attrs().get("url").map(String::as_str))
}

/// Children of `ext` whose local name is `local`, whatever prefix they carry.
fn children_named<'a>(ext: &'a Extension, local: &'a str) -> impl Iterator<Item = &'a Extension> + 'a {
    ext.children()
        .iter()
        .filter(move |(name, _)| name.rsplit(':').next() == Some(local))
        .flat_map(|(_, list)| list.iter())
}
