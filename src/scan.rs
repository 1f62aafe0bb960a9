//! Pure HTML scanners: page body in, optional URL out.
//!
//! Kept free of I/O so each heuristic can be pinned down against fixed
//! fixtures. Meta tags are read with [`scraper`]; the aggregator interstitial
//! pages are scanned with regexes because the interesting URLs sit in
//! attributes of otherwise unremarkable markup.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// Host of the aggregator's redirect/search proxy.
pub const AGGREGATOR_HOST: &str = "news.google.com";

/// Registrable domain of the aggregator.
pub const AGGREGATOR_DOMAIN: &str = "google.com";

/// Domain the aggregator serves thumbnails from.
pub const AGGREGATOR_IMAGE_DOMAIN: &str = "googleusercontent.com";

const GENERIC_IMAGE_MARKERS: &[&str] = &[
    "logo",
    "favicon",
    "icon",
    "default.jpg",
    "share-image",
    "placeholder",
    "brand",
];

static OG_IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"], meta[name="og:image"]"#)
        .expect("valid og:image selector")
});

static TWITTER_IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"meta[name="twitter:image"], meta[property="twitter:image"], meta[name="twitter:image:src"], meta[property="twitter:image:src"]"#,
    )
    .expect("valid twitter:image selector")
});

static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src]").expect("valid img selector"));

static IMAGE_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(?:jpg|jpeg|png|gif|webp|svg)$").expect("valid image file regex")
});

static INLINE_PHOTO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(?:jpg|jpeg|png|webp)").expect("valid photo regex"));

static DATA_AUTHOR_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"data-n-au=["'](https?://[^"']+)["']"#).expect("valid data-n-au regex")
});

static HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href=["'](https?://[^"']+)["']"#).expect("valid href regex"));

static AGGREGATOR_THUMBNAIL_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)src=["'](https?://lh\d*\.googleusercontent\.com[^"']+)["']"#,
        r#"(?i)src=["'](https?://[^"']*(?:googleusercontent|gstatic)[^"']*\.(?:jpg|jpeg|png|webp)[^"']*)["']"#,
        r#"(?i)srcset=["']([^"'\s]+)"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid thumbnail regex"))
    .collect()
});

/// Whether `url` is an aggregator redirect link worth resolving.
pub fn is_aggregator_link(url: &str) -> bool {
    url.contains(AGGREGATOR_HOST)
}

/// Whether `url` is served by the aggregator or its image host.
pub fn is_aggregator_owned(url: &str) -> bool {
    url.contains(AGGREGATOR_DOMAIN) || url.contains(AGGREGATOR_IMAGE_DOMAIN)
}

/// Whether `url` names an image file rather than a page.
pub fn is_image_file(url: &str) -> bool {
    IMAGE_FILE_RE.is_match(url)
}

/// Logos, favicons, share cards and other images that say nothing about the story.
pub fn is_generic_image(url: &str) -> bool {
    let lower = url.trim().to_lowercase();
    lower.is_empty()
        || lower.ends_with(".svg")
        || GENERIC_IMAGE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// `content` of the first matching meta tag that is not a generic image.
///
/// Generic matches are skipped, so a page that lists its logo before the
/// story photo still yields the photo.
fn first_meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|content| !is_generic_image(content))
        .map(str::to_string)
}

/// The page's first non-generic `og:image`.
pub fn og_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    first_meta_content(&document, &OG_IMAGE_SELECTOR)
}

/// Best preview image from a publisher page.
///
/// Order: first non-generic `og:image`, first non-generic `twitter:image`,
/// then the first absolute non-generic `<img>` that looks like a photo.
pub fn preview_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    first_meta_content(&document, &OG_IMAGE_SELECTOR)
        .or_else(|| first_meta_content(&document, &TWITTER_IMAGE_SELECTOR))
        .or_else(|| {
            document
                .select(&IMG_SELECTOR)
                .filter_map(|el| el.value().attr("src"))
                .map(str::trim)
                .filter(|src| src.starts_with("http://") || src.starts_with("https://"))
                .filter(|src| INLINE_PHOTO_RE.is_match(src))
                .find(|src| !is_generic_image(src))
                .map(str::to_string)
        })
}

/// The publisher URL an aggregator interstitial page points at.
///
/// Looks at `data-n-au` attributes first, then plain anchors, and returns the
/// first absolute URL outside the aggregator's domains.
pub fn publisher_url(html: &str) -> Option<String> {
    [&*DATA_AUTHOR_URL_RE, &*HREF_RE].into_iter().find_map(|re| {
        re.captures_iter(html)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .find(|url| !is_aggregator_owned(url))
            .map(|url| url.replace("&amp;", "&"))
    })
}

/// A thumbnail hosted by the aggregator, as embedded in its own pages.
pub fn aggregator_thumbnail(html: &str) -> Option<String> {
    AGGREGATOR_THUMBNAIL_RES
        .iter()
        .find_map(|re| re.captures(html).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().replace("&amp;", "&"))
}
