//! Strategy 3: pattern extraction over raw markup.
//!
//! When neither XML parser accepts a document (unescaped ampersands,
//! truncated bodies, HTML error pages wrapping a feed) this pulls `<item>`
//! blocks out with tolerant regexes. Text may be CDATA-wrapped or bare; bare
//! text is XML-unescaped once here, CDATA content is taken verbatim.
//! Image references found along the way go into
//! [`RawFeedItem::scraped_images`].

use super::{FeedStrategy, fetch_feed_body, non_blank};
use crate::fetch::Fetcher;
use crate::models::RawFeedItem;
use crate::normalize::{clean_text, first_img_src};
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use quick_xml::escape::unescape;
use regex::Regex;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

static ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<item[\s>](.*?)</item>").expect("valid item regex"));

static ENCLOSURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<enclosure[^>]+url=["']([^"']+)["']"#).expect("valid enclosure regex")
});

static MEDIA_CONTENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<media:content[^>]+url=["']([^"']+)["']"#).expect("valid media regex")
});

static MEDIA_THUMBNAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<media:thumbnail[^>]+url=["']([^"']+)["']"#).expect("valid thumbnail regex")
});

/// Regex for the text of `<tag>`: group 1 is CDATA content, group 2 bare text.
fn element_re(tag: &str) -> Regex {
    let tag = regex::escape(tag);
    Regex::new(&format!(
        r"(?is)<{tag}[^>]*>\s*(?:<!\[CDATA\[(.*?)\]\]>\s*|(.*?))</{tag}>"
    ))
    .expect("valid element regex")
}

static TITLE_RE: Lazy<Regex> = Lazy::new(|| element_re("title"));
static LINK_RE: Lazy<Regex> = Lazy::new(|| element_re("link"));
static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| element_re("description"));
static PUB_DATE_RE: Lazy<Regex> = Lazy::new(|| element_re("pubDate"));
static CONTENT_ENCODED_RE: Lazy<Regex> = Lazy::new(|| element_re("content:encoded"));

pub struct LenientStrategy {
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
    cap: usize,
}

impl LenientStrategy {
    pub fn new(fetcher: Arc<dyn Fetcher>, timeout: Duration, cap: usize) -> Self {
        Self {
            fetcher,
            timeout,
            cap,
        }
    }

    async fn fetch_and_extract(&self, url: &str) -> Option<Vec<RawFeedItem>> {
        let body = fetch_feed_body(self.fetcher.as_ref(), url, self.timeout).await?;
        let items = extract_items(&body, self.cap);
        debug!(%url, count = items.len(), "Lenient extraction finished");
        (!items.is_empty()).then_some(items)
    }
}

impl FeedStrategy for LenientStrategy {
    fn name(&self) -> &'static str {
        "lenient"
    }

    fn items<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Option<Vec<RawFeedItem>>> {
        Box::pin(self.fetch_and_extract(url))
    }
}

fn capture(re: &Regex, block: &str) -> Option<String> {
    re.captures(block).and_then(|caps| non_blank(caps.get(1).map(|m| m.as_str())))
}

/// Text of the first element matched by `re`, or `None` when it is absent.
///
/// Bare text that does not unescape cleanly (stray `&`) is kept raw.
fn element_text(re: &Regex, block: &str) -> Option<String> {
    let caps = re.captures(block)?;
    if let Some(cdata) = caps.get(1) {
        return Some(cdata.as_str().to_string());
    }
    let raw = caps.get(2).map_or("", |m| m.as_str());
    Some(unescape(raw).unwrap_or(Cow::Borrowed(raw)).into_owned())
}

fn element_field(re: &Regex, block: &str) -> Option<String> {
    non_blank(element_text(re, block).as_deref())
}

/// Extract up to `cap` items from raw markup. Blocks without a title are skipped.
pub fn extract_items(xml: &str, cap: usize) -> Vec<RawFeedItem> {
    ITEM_RE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter_map(|block| {
            let title = clean_text(&element_text(&TITLE_RE, block)?);
            let description = element_field(&DESCRIPTION_RE, block);

            let scraped_images = [
                capture(&MEDIA_CONTENT_RE, block),
                capture(&MEDIA_THUMBNAIL_RE, block),
                description.as_deref().and_then(first_img_src),
            ]
            .into_iter()
            .flatten()
            .collect();

            Some(RawFeedItem {
                title: Some(title),
                link: element_field(&LINK_RE, block),
                description,
                content_encoded: element_field(&CONTENT_ENCODED_RE, block),
                pub_date: element_field(&PUB_DATE_RE, block),
                enclosure_url: capture(&ENCLOSURE_RE, block),
                scraped_images,
                ..Default::default()
            })
        })
        .take(cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_cdata_and_bare_fields() {
        let xml = r#"<rss><channel>
<item>
  <title><![CDATA[Storm <b>hits</b> city]]></title>
  <link>https://news.test/storm</link>
  <description><![CDATA[<img src="https://cdn.test/desc.jpg"> Wind & rain]]></description>
  <pubDate> Fri, 05 Jan 2024 10:30:00 GMT </pubDate>
  <enclosure url="https://cdn.test/enc.jpg" type="image/jpeg"/>
  <media:thumbnail url='https://cdn.test/thumb.jpg'/>
</item>
<item><title>Bare & unescaped</title><link>https://news.test/bare</link></item>
"#;
        let items = extract_items(xml, 10);
        assert_eq!(items.len(), 2);

        let storm = &items[0];
        assert_eq!(storm.title.as_deref(), Some("Storm hits city"));
        assert_eq!(storm.link.as_deref(), Some("https://news.test/storm"));
        assert_eq!(storm.pub_date.as_deref(), Some("Fri, 05 Jan 2024 10:30:00 GMT"));
        assert_eq!(storm.enclosure_url.as_deref(), Some("https://cdn.test/enc.jpg"));
        assert_eq!(
            storm.scraped_images,
            vec!["https://cdn.test/thumb.jpg".to_string(), "https://cdn.test/desc.jpg".to_string()]
        );

        assert_eq!(items[1].title.as_deref(), Some("Bare & unescaped"));
        assert!(items[1].description.is_none());
    }

    #[test]
    fn test_escaped_description_yields_plain_summary() {
        let xml = "<item><title>Forecast</title>\
            <link>https://news.test/forecast?a=1&amp;b=2</link>\
            <description>&lt;p&gt;Heavy &lt;b&gt;rain&lt;/b&gt; expected&lt;/p&gt;\
            &lt;img src=&quot;https://cdn.test/rain.jpg&quot;&gt;</description>\
            <pubDate>Fri, 05 Jan 2024 10:30:00 GMT</pubDate></item>";
        let items = extract_items(xml, 10);
        assert_eq!(items[0].link.as_deref(), Some("https://news.test/forecast?a=1&b=2"));
        assert_eq!(items[0].scraped_images, vec!["https://cdn.test/rain.jpg".to_string()]);

        let now = chrono::DateTime::parse_from_rfc3339("2024-01-06T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let normalizer = crate::normalize::ArticleNormalizer::new(5, chrono::Duration::days(7));
        let articles = normalizer.normalize(items, now).unwrap();
        assert_eq!(articles[0].summary, "Heavy rain expected");
        assert!(!articles[0].summary.contains('<'));
        assert_eq!(articles[0].image.as_deref(), Some("https://cdn.test/rain.jpg"));
    }

    #[test]
    fn test_skips_untitled_blocks_and_caps() {
        let mut xml = String::from("<item><link>https://news.test/no-title</link></item>");
        for i in 0..15 {
            xml.push_str(&format!("<item><title>t{i}</title></item>"));
        }
        let items = extract_items(&xml, 10);
        assert_eq!(items.len(), 10);
        assert_eq!(items[0].title.as_deref(), Some("t0"));
    }

    #[test]
    fn test_item_tag_prefix_does_not_match_other_elements() {
        let xml = "<itemList><title>nope</title></itemList>";
        assert!(extract_items(xml, 10).is_empty());
    }
}
