//! Data models for sources, raw feed items and resolved articles.
//!
//! This module defines the core data structures used throughout the crate:
//! - [`Source`]: A configured logical outlet with its candidate feed URLs
//! - [`RawFeedItem`]: The single item shape every parse strategy produces
//! - [`NormalizedArticle`]: A cleaned, bounded article ready for display
//! - [`ResolvedSource`]: The per-source unit that is cached and returned
//! - [`BatchResponse`], [`SourceResponse`], [`ErrorResponse`]: JSON envelopes
//!
//! The wire names (`pubDate`, `lastUpdated`, `id`) match what the dashboard
//! front end reads, hence the serde renames.

use crate::error::AggregatorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured logical news outlet.
///
/// Each source carries one or more candidate feed URLs believed to serve the
/// same content (mirrors, alternate paths, search-proxy queries). They are
/// tried strictly in order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Source {
    /// Stable unique key, also the cache key.
    pub id: String,
    /// Display name shown on the dashboard tab.
    pub name: String,
    /// Accent color for the source card.
    pub color: String,
    /// Short glyph or emoji shown next to the name.
    pub icon: String,
    /// Social platform tag for trending proxies (`"x"`, `"tiktok"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Candidate feed URLs in priority order. Never empty once validated.
    pub feeds: Vec<String>,
}

impl Source {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        color: impl Into<String>,
        icon: impl Into<String>,
        feeds: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            icon: icon.into(),
            platform: None,
            feeds,
        }
    }

    /// Tag this source as a trending proxy for a social platform.
    pub fn on_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

/// One item as extracted by a parse strategy.
///
/// Every strategy maps its own view of the markup onto this shape at the
/// strategy boundary, so normalization never needs to know which parser
/// produced an item. Text fields hold raw markup; cleaning happens later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    /// `content:encoded` body, usually full HTML.
    pub content_encoded: Option<String>,
    /// Plain `<content>` body (Atom).
    pub content: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Short teaser text when the feed provides one.
    pub snippet: Option<String>,
    /// Dublin Core `dc:description`.
    pub dc_description: Option<String>,
    /// Publish date exactly as the feed wrote it.
    pub pub_date: Option<String>,
    pub enclosure_url: Option<String>,
    pub media_content_url: Option<String>,
    pub media_thumbnail_url: Option<String>,
    /// `media:content` nested inside `media:group`.
    pub media_group_url: Option<String>,
    /// Image URLs found by pattern matching over raw markup, in discovery order.
    pub scraped_images: Vec<String>,
}

/// A cleaned article ready for the dashboard.
///
/// # Invariants
///
/// - `title` is never empty (`"Untitled"` when the feed gave nothing).
/// - `summary` is plain text of at most 450 characters.
/// - `link` is an absolute URL or the `"#"` placeholder, never markup.
/// - `image`, when set, is an absolute http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NormalizedArticle {
    pub title: String,
    pub link: String,
    pub summary: String,
    #[serde(rename = "pubDate")]
    pub published_at: Option<DateTime<Utc>>,
    pub image: Option<String>,
}

impl NormalizedArticle {
    /// Whether the article points anywhere a reader could follow.
    pub fn has_link(&self) -> bool {
        !self.link.is_empty() && self.link != crate::normalize::PLACEHOLDER_LINK
    }
}

/// The outcome of resolving one source; the unit stored in the cache.
///
/// An empty `articles` list is a successful outcome: every candidate feed
/// was tried and none produced usable items.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResolvedSource {
    #[serde(rename = "id")]
    pub source_id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub platform: Option<String>,
    /// Most recent first, at most five.
    pub articles: Vec<NormalizedArticle>,
    #[serde(rename = "lastUpdated")]
    pub resolved_at: DateTime<Utc>,
}

impl ResolvedSource {
    /// Copy the display metadata from `source` and attach `articles`.
    pub fn from_source(
        source: &Source,
        articles: Vec<NormalizedArticle>,
        resolved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: source.id.clone(),
            name: source.name.clone(),
            color: source.color.clone(),
            icon: source.icon.clone(),
            platform: source.platform.clone(),
            articles,
            resolved_at,
        }
    }
}

/// Envelope for a batch of resolved sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub data: Vec<ResolvedSource>,
    pub timestamp: DateTime<Utc>,
}

impl BatchResponse {
    pub fn new(data: Vec<ResolvedSource>) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Envelope for a single resolved source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceResponse {
    pub success: bool,
    pub data: ResolvedSource,
}

/// Envelope for a failed request, e.g. an unknown source id.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

impl From<&AggregatorError> for ErrorResponse {
    fn from(error: &AggregatorError) -> Self {
        match error {
            AggregatorError::SourceNotFound(_) => Self::new("Source not found"),
            other => Self::new(other.to_string()),
        }
    }
}
