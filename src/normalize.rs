//! Turning raw feed items into dashboard articles.
//!
//! Normalization is synchronous and network-free. Given the items one parse
//! strategy produced for one candidate URL it:
//!
//! 1. sorts them newest first (unparseable dates last),
//! 2. rejects the whole feed if even its newest item is older than the
//!    staleness threshold,
//! 3. collapses duplicate links and keeps the top N,
//! 4. builds a [`NormalizedArticle`] per item: cleaned title, link, summary
//!    from the richest text field, parsed date, and the best image reference.
//!
//! The text helpers ([`clean_text`], [`truncate_summary`], [`parse_pub_date`])
//! are exposed for the parsers and scanners that share the same hygiene rules.

use crate::models::{NormalizedArticle, RawFeedItem};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use url::Url;

/// Title used when a feed item has none.
pub const UNTITLED: &str = "Untitled";

/// Link used when a feed item has none.
pub const PLACEHOLDER_LINK: &str = "#";

/// Summary used when no text field survives cleaning.
pub const PLACEHOLDER_SUMMARY: &str = "Tap to read the full article.";

/// Maximum summary length in characters.
pub const SUMMARY_MAX_CHARS: usize = 450;

/// A sentence boundary must sit after this character index to be used.
const SENTENCE_BOUNDARY_MIN: usize = 200;

/// Hard-cut length when no usable sentence boundary exists.
const HARD_CUT_CHARS: usize = 447;

/// Image-proxy host whose inline images are tracking pixels, not photos.
const FEED_PROXY_IMAGE_HOST: &str = "feedburner";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:(amp|lt|gt|quot|apos|nbsp|#39)|#(\d{1,7})|#[xX]([0-9a-fA-F]{1,6}));")
        .expect("valid entity regex")
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static LEADING_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s\-–—:|,]+").expect("valid separator regex"));

static IMG_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("valid img regex")
});

/// Decode the common named entities and numeric character references.
///
/// Unknown named entities are left untouched.
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            if let Some(named) = caps.get(1) {
                return match named.as_str() {
                    "amp" => "&".to_string(),
                    "lt" => "<".to_string(),
                    "gt" => ">".to_string(),
                    "quot" => "\"".to_string(),
                    "apos" | "#39" => "'".to_string(),
                    _ => " ".to_string(),
                };
            }
            let code = if let Some(dec) = caps.get(2) {
                dec.as_str().parse::<u32>().ok()
            } else {
                caps.get(3).and_then(|hex| u32::from_str_radix(hex.as_str(), 16).ok())
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Strip every tag, decode entities and collapse whitespace runs.
///
/// Tags are stripped again after decoding, so entity-escaped markup
/// (`&lt;p&gt;`, `&#60;b&#62;`) never survives as text.
pub fn clean_text(raw: &str) -> String {
    let without_tags = TAG_RE.replace_all(raw, " ");
    let decoded = decode_entities(&without_tags);
    let without_escaped_tags = TAG_RE.replace_all(&decoded, " ");
    WHITESPACE_RE
        .replace_all(&without_escaped_tags, " ")
        .trim()
        .to_string()
}

/// Parse a feed date string permissively.
///
/// Accepts RFC 2822 (RSS), RFC 3339 (Atom), a handful of common variants
/// with or without an offset, and bare dates. Dates without an offset are
/// taken as UTC. Anything else yields `None`, which sorts as oldest.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // "UTC" is not an RFC 2822 zone name, but feeds use it anyway.
    if let Some(stripped) = s.strip_suffix(" UTC") {
        if let Ok(dt) = DateTime::parse_from_rfc2822(&format!("{stripped} +0000")) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    const OFFSET_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S %z",
        "%a, %d %b %Y %H:%M %z",
        "%d %b %Y %H:%M:%S %z",
    ];
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%a, %d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M:%S",
        "%B %d, %Y %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%d %B %Y"];
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}

/// Cut a summary to at most 450 characters.
///
/// Prefers ending at the last `.`, `?` or `!` inside the first 450
/// characters, provided it sits past index 200. Otherwise hard-cuts at 447
/// characters and appends `...`.
pub fn truncate_summary(text: &str) -> String {
    if text.chars().count() <= SUMMARY_MAX_CHARS {
        return text.to_string();
    }
    let window: Vec<char> = text.chars().take(SUMMARY_MAX_CHARS).collect();
    match window.iter().rposition(|c| matches!(c, '.' | '?' | '!')) {
        Some(boundary) if boundary > SENTENCE_BOUNDARY_MIN => window[..=boundary].iter().collect(),
        _ => {
            let mut cut: String = window[..HARD_CUT_CHARS].iter().collect();
            cut.push_str("...");
            cut
        }
    }
}

/// Pick the most informative summary for `item`.
///
/// Every candidate field is cleaned and the longest wins, since short fields
/// are often the title repeated. A leading copy of the title (and any
/// separator after it) is removed.
pub fn extract_summary(item: &RawFeedItem, title: &str) -> String {
    let candidates = [
        &item.content_encoded,
        &item.content,
        &item.summary,
        &item.description,
        &item.snippet,
        &item.dc_description,
    ];

    let mut best = String::new();
    for raw in candidates.into_iter().flatten() {
        let cleaned = clean_text(raw);
        if cleaned.chars().count() > best.chars().count() {
            best = cleaned;
        }
    }

    let title = title.trim();
    if !title.is_empty() {
        if let Some(rest) = best.strip_prefix(title) {
            best = LEADING_SEPARATOR_RE.replace(rest, "").trim().to_string();
        }
    }

    if best.is_empty() {
        return PLACEHOLDER_SUMMARY.to_string();
    }
    truncate_summary(&best)
}

/// First `<img src>` in `html`, unless it is served by the feed image proxy.
pub fn first_img_src(html: &str) -> Option<String> {
    IMG_SRC_RE
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
        .filter(|src| !src.to_lowercase().contains(FEED_PROXY_IMAGE_HOST))
}

/// Pick the best image reference carried by the item itself.
///
/// Order: enclosure, `media:content`, `media:thumbnail`, `media:group`,
/// pattern-scraped URLs, then the first `<img>` inside a body field.
pub fn extract_image(item: &RawFeedItem) -> Option<String> {
    let structured = [
        &item.enclosure_url,
        &item.media_content_url,
        &item.media_thumbnail_url,
        &item.media_group_url,
    ];
    if let Some(url) = structured
        .into_iter()
        .flatten()
        .chain(item.scraped_images.iter())
        .map(|u| u.trim())
        .find(|u| !u.is_empty())
    {
        return Some(url.to_string());
    }

    [&item.content, &item.content_encoded, &item.description, &item.summary]
        .into_iter()
        .flatten()
        .find_map(|body| first_img_src(body))
}

/// Make `image` absolute against the article `link`.
///
/// Returns `None` when the result is not an http(s) URL.
pub fn absolutize_image(image: &str, link: &str) -> Option<String> {
    let image = decode_entities(image.trim());
    let (resolved, text) = match Url::parse(&image) {
        Ok(url) => (url, image),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let joined = Url::parse(link).ok()?.join(&image).ok()?;
            let text = joined.to_string();
            (joined, text)
        }
        Err(_) => return None,
    };
    matches!(resolved.scheme(), "http" | "https").then_some(text)
}

/// Reduce a raw link to a single absolute URL, or the placeholder.
pub fn clean_link(raw: Option<&str>) -> String {
    let cleaned = raw.map(clean_text).unwrap_or_default();
    cleaned
        .split_whitespace()
        .next()
        .filter(|link| link.starts_with("http://") || link.starts_with("https://"))
        .map(str::to_string)
        .unwrap_or_else(|| PLACEHOLDER_LINK.to_string())
}

/// Sort items newest first; items with unparseable dates keep their relative
/// order and go last.
pub fn sort_newest_first(items: Vec<RawFeedItem>) -> Vec<(Option<DateTime<Utc>>, RawFeedItem)> {
    let mut dated: Vec<_> = items
        .into_iter()
        .map(|item| (item.pub_date.as_deref().and_then(parse_pub_date), item))
        .collect();
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    dated
}

/// Whether a newest-first list belongs to an abandoned feed.
///
/// Only the first `window` entries are inspected. A feed with no parseable
/// dates at all is never considered stale.
pub fn is_stale(
    sorted: &[(Option<DateTime<Utc>>, RawFeedItem)],
    window: usize,
    now: DateTime<Utc>,
    stale_after: chrono::Duration,
) -> bool {
    sorted
        .iter()
        .take(window)
        .filter_map(|(date, _)| *date)
        .max()
        .is_some_and(|newest| now - newest > stale_after)
}

/// Build one article from a raw item and its already-parsed date.
pub fn normalize_item(item: &RawFeedItem, published_at: Option<DateTime<Utc>>) -> NormalizedArticle {
    let title = item
        .title
        .as_deref()
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    let link = clean_link(item.link.as_deref());
    let summary = extract_summary(item, &title);
    let image = extract_image(item).and_then(|img| absolutize_image(&img, &link));

    NormalizedArticle {
        title,
        link,
        summary,
        published_at,
        image,
    }
}

/// Staleness guard plus selection, configured from the resolver settings.
#[derive(Debug, Clone)]
pub struct ArticleNormalizer {
    pub max_articles: usize,
    pub stale_after: chrono::Duration,
}

impl ArticleNormalizer {
    pub fn new(max_articles: usize, stale_after: chrono::Duration) -> Self {
        Self {
            max_articles,
            stale_after,
        }
    }

    /// Normalize one feed's items.
    ///
    /// Returns `None` when the feed is stale, so the caller moves on to the
    /// next candidate URL.
    pub fn normalize(&self, items: Vec<RawFeedItem>, now: DateTime<Utc>) -> Option<Vec<NormalizedArticle>> {
        let sorted = sort_newest_first(items);
        if is_stale(&sorted, self.max_articles, now, self.stale_after) {
            return None;
        }

        let articles = sorted
            .into_iter()
            .enumerate()
            .unique_by(|(index, (_, item))| {
                item.link
                    .as_deref()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{PLACEHOLDER_LINK}{index}"))
            })
            .take(self.max_articles)
            .map(|(_, (published_at, item))| normalize_item(&item, published_at))
            .collect();
        Some(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str, link: &str, date: Option<&str>) -> RawFeedItem {
        RawFeedItem {
            title: Some(title.to_string()),
            link: Some(link.to_string()),
            pub_date: date.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_text_strips_tags_and_entities() {
        let raw = "<p>Rates &amp; <b>prices</b>&nbsp;rise&#8230;</p>\n\n  again";
        assert_eq!(clean_text(raw), "Rates & prices rise… again");
    }

    #[test]
    fn test_clean_text_strips_escaped_markup() {
        assert_eq!(clean_text("a &lt;b&gt;bold&lt;/b&gt; c"), "a bold c");
        assert_eq!(clean_text("&#60;p&#62;Numeric&#60;/p&#62;"), "Numeric");
        assert_eq!(clean_text("<div><img src='x.jpg'/></div>"), "");
        assert_eq!(clean_text("5 &lt; 7"), "5 < 7");
    }

    #[test]
    fn test_summary_from_escaped_markup_has_no_tags() {
        let raw = RawFeedItem {
            description: Some("&lt;p&gt;Heavy &lt;b&gt;rain&lt;/b&gt; expected&lt;/p&gt;".to_string()),
            ..Default::default()
        };
        let summary = extract_summary(&raw, "Forecast");
        assert_eq!(summary, "Heavy rain expected");
        assert!(!summary.contains('<') && !summary.contains('>'));
    }

    #[test]
    fn test_decode_hex_and_invalid_numeric_entities() {
        assert_eq!(decode_entities("&#x41;&#39;&#1114112;"), "A'");
        assert_eq!(decode_entities("&hellip;"), "&hellip;");
    }

    #[test]
    fn test_parse_pub_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 5, 10, 30, 0).unwrap();
        assert_eq!(parse_pub_date("Fri, 05 Jan 2024 10:30:00 GMT"), Some(expected));
        assert_eq!(parse_pub_date("Fri, 05 Jan 2024 12:30:00 +0200"), Some(expected));
        assert_eq!(parse_pub_date("2024-01-05T10:30:00Z"), Some(expected));
        assert_eq!(parse_pub_date("2024-01-05 10:30:00"), Some(expected));
        assert_eq!(parse_pub_date("Fri, 05 Jan 2024 10:30:00 UTC"), Some(expected));
        assert_eq!(
            parse_pub_date("2024-01-05"),
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_pub_date("yesterday-ish"), None);
        assert_eq!(parse_pub_date("   "), None);
    }

    #[test]
    fn test_truncate_at_sentence_boundary() {
        let mut text = "a".repeat(299);
        text.push('.');
        text.push_str(&"b".repeat(200));
        assert_eq!(text.chars().count(), 500);

        let out = truncate_summary(&text);
        assert_eq!(out.chars().count(), 300);
        assert!(out.ends_with('.'));
    }

    #[test]
    fn test_truncate_hard_cut_without_boundary() {
        let text = "x".repeat(500);
        let out = truncate_summary(&text);
        assert_eq!(out.chars().count(), 450);
        assert!(out.ends_with("..."));
        assert_eq!(&out[..447], &text[..447]);
    }

    #[test]
    fn test_truncate_ignores_early_boundary() {
        let mut text = "Short lead. ".to_string();
        text.push_str(&"y".repeat(488));
        let out = truncate_summary(&text);
        assert_eq!(out.chars().count(), 450);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let text = "ع".repeat(460);
        let out = truncate_summary(&text);
        assert_eq!(out.chars().count(), 450);
    }

    #[test]
    fn test_summary_strips_duplicated_title() {
        let raw = RawFeedItem {
            description: Some("Storm hits city - More details inside...".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_summary(&raw, "Storm hits city"), "More details inside...");
    }

    #[test]
    fn test_summary_prefers_longest_field() {
        let raw = RawFeedItem {
            content_encoded: Some("<p>Short</p>".to_string()),
            description: Some("<p>A considerably longer description of events.</p>".to_string()),
            dc_description: Some("Mid length text".to_string()),
            ..Default::default()
        };
        assert_eq!(
            extract_summary(&raw, "Headline"),
            "A considerably longer description of events."
        );
    }

    #[test]
    fn test_summary_placeholder_when_only_title() {
        let raw = RawFeedItem {
            description: Some("<a href=\"x\">Storm hits city</a>".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_summary(&raw, "Storm hits city"), PLACEHOLDER_SUMMARY);
        assert_eq!(extract_summary(&RawFeedItem::default(), "t"), PLACEHOLDER_SUMMARY);
    }

    #[test]
    fn test_image_priority_enclosure_first() {
        let raw = RawFeedItem {
            enclosure_url: Some("https://cdn.test/enclosure.jpg".to_string()),
            media_content_url: Some("https://cdn.test/media.jpg".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_image(&raw).as_deref(), Some("https://cdn.test/enclosure.jpg"));
    }

    #[test]
    fn test_image_falls_through_media_chain() {
        let raw = RawFeedItem {
            media_group_url: Some("https://cdn.test/group.jpg".to_string()),
            scraped_images: vec!["https://cdn.test/scraped.jpg".to_string()],
            ..Default::default()
        };
        assert_eq!(extract_image(&raw).as_deref(), Some("https://cdn.test/group.jpg"));

        let raw = RawFeedItem {
            scraped_images: vec!["https://cdn.test/scraped.jpg".to_string()],
            description: Some(r#"<img src="https://cdn.test/body.jpg">"#.to_string()),
            ..Default::default()
        };
        assert_eq!(extract_image(&raw).as_deref(), Some("https://cdn.test/scraped.jpg"));
    }

    #[test]
    fn test_image_from_body_rejects_feed_proxy() {
        let raw = RawFeedItem {
            description: Some(r#"<img src="https://feeds.feedburner.com/~r/x/~4/pixel">"#.to_string()),
            summary: Some(r#"<img src='https://cdn.test/photo.png' alt=''>"#.to_string()),
            ..Default::default()
        };
        assert_eq!(extract_image(&raw).as_deref(), Some("https://cdn.test/photo.png"));
    }

    #[test]
    fn test_absolutize_image() {
        assert_eq!(
            absolutize_image("/img/a.jpg", "https://news.test/story/1").as_deref(),
            Some("https://news.test/img/a.jpg")
        );
        assert_eq!(
            absolutize_image("https://cdn.test/a.jpg?w=1&amp;h=2", "#").as_deref(),
            Some("https://cdn.test/a.jpg?w=1&h=2")
        );
        assert_eq!(absolutize_image("/img/a.jpg", "#"), None);
        assert_eq!(absolutize_image("data:image/png;base64,xx", "https://a.test"), None);
    }

    #[test]
    fn test_clean_link() {
        assert_eq!(clean_link(Some("  https://a.test/x?a=1&amp;b=2 ")), "https://a.test/x?a=1&b=2");
        assert_eq!(clean_link(Some("")), PLACEHOLDER_LINK);
        assert_eq!(clean_link(None), PLACEHOLDER_LINK);
        assert_eq!(clean_link(Some("<a>not a url</a>")), PLACEHOLDER_LINK);
    }

    #[test]
    fn test_ordering_newest_first_unparseable_last() {
        let normalizer = ArticleNormalizer::new(5, chrono::Duration::days(7));
        let now = Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap();
        let items = vec![
            item("jan1", "https://a.test/1", Some("2024-01-01")),
            item("jan5", "https://a.test/5", Some("2024-01-05")),
            item("bad", "https://a.test/x", Some("not a date")),
        ];
        let articles = normalizer.normalize(items, now).unwrap();
        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["jan5", "jan1", "bad"]);
        assert!(articles[2].published_at.is_none());
    }

    #[test]
    fn test_stale_feed_is_rejected() {
        let normalizer = ArticleNormalizer::new(5, chrono::Duration::days(7));
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let items = (1..=6)
            .map(|d| item("old", &format!("https://a.test/{d}"), Some(&format!("2024-01-0{d}"))))
            .collect();
        assert!(normalizer.normalize(items, now).is_none());
    }

    #[test]
    fn test_undated_feed_is_not_stale() {
        let normalizer = ArticleNormalizer::new(5, chrono::Duration::days(7));
        let items = vec![item("a", "https://a.test/1", None)];
        assert_eq!(normalizer.normalize(items, Utc::now()).unwrap().len(), 1);
    }

    #[test]
    fn test_selection_caps_and_dedupes() {
        let normalizer = ArticleNormalizer::new(5, chrono::Duration::days(7));
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let mut items: Vec<_> = (1..=8)
            .map(|d| item(&format!("t{d}"), &format!("https://a.test/{d}"), Some(&format!("2024-01-0{d}"))))
            .collect();
        items.push(item("dupe", "https://a.test/8", Some("2024-01-08")));
        let articles = normalizer.normalize(items, now).unwrap();
        assert_eq!(articles.len(), 5);
        assert_eq!(articles[0].link, "https://a.test/8");
        assert_eq!(articles[1].link, "https://a.test/7");
    }

    #[test]
    fn test_normalize_item_defaults() {
        let article = normalize_item(&RawFeedItem::default(), None);
        assert_eq!(article.title, UNTITLED);
        assert_eq!(article.link, PLACEHOLDER_LINK);
        assert_eq!(article.summary, PLACEHOLDER_SUMMARY);
        assert!(article.image.is_none());
    }
}
