//! Configured sources, split into dashboard groups.
//!
//! The built-in registry carries the deployed outlet list: regional and
//! international news outlets plus three social "trending" proxies backed by
//! Google News searches. A YAML file with the same shape replaces it
//! wholesale:
//!
//! ```yaml
//! news:
//!   - id: bbc
//!     name: BBC News
//!     color: "#BB1919"
//!     icon: "📺"
//!     feeds:
//!       - https://feeds.bbci.co.uk/news/rss.xml
//! social: []
//! ```
//!
//! Ids are unique across both groups because they double as cache keys.

use crate::error::AggregatorError;
use crate::models::Source;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{info, instrument};

const GOOGLE_NEWS_SEARCH: &str = "https://news.google.com/rss/search";

/// Which part of the dashboard a request is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceGroup {
    News,
    Social,
    All,
}

impl fmt::Display for SourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceGroup::News => "news",
            SourceGroup::Social => "social",
            SourceGroup::All => "all",
        };
        f.write_str(name)
    }
}

/// Google News RSS search URL for `query` in interface language `hl`.
pub fn google_news_search(query: &str, hl: &str) -> String {
    format!(
        "{GOOGLE_NEWS_SEARCH}?q={}&hl={}",
        urlencoding::encode(query),
        urlencoding::encode(hl)
    )
}

/// Like [`google_news_search`] but pinned to a country edition (`gl`/`ceid`).
pub fn google_news_search_regional(query: &str, hl: &str, country: &str) -> String {
    format!(
        "{}&gl={country}&ceid={}",
        google_news_search(query, hl),
        urlencoding::encode(&format!("{country}:{hl}"))
    )
}

/// Read-only list of sources, shared by every resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceRegistry {
    #[serde(default)]
    pub news: Vec<Source>,
    #[serde(default)]
    pub social: Vec<Source>,
}

impl SourceRegistry {
    /// Parse and validate a YAML registry.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, AggregatorError> {
        let registry: SourceRegistry = serde_yaml::from_str(yaml)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Load a YAML registry from disk.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AggregatorError> {
        let yaml = tokio::fs::read_to_string(path.as_ref()).await?;
        let registry = Self::from_yaml_str(&yaml)?;
        info!(
            news = registry.news.len(),
            social = registry.social.len(),
            "Loaded source registry"
        );
        Ok(registry)
    }

    /// Reject blank ids, sources without feeds and duplicate ids.
    pub fn validate(&self) -> Result<(), AggregatorError> {
        let mut seen = HashSet::new();
        for source in self.news.iter().chain(&self.social) {
            if source.id.trim().is_empty() {
                return Err(AggregatorError::InvalidConfig(format!(
                    "source {:?} has an empty id",
                    source.name
                )));
            }
            if source.feeds.iter().all(|feed| feed.trim().is_empty()) {
                return Err(AggregatorError::InvalidConfig(format!(
                    "source {} has no feed URLs",
                    source.id
                )));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(AggregatorError::InvalidConfig(format!(
                    "duplicate source id {}",
                    source.id
                )));
            }
        }
        Ok(())
    }

    /// Sources in `group`, in configured order. `All` lists news first.
    pub fn group(&self, group: SourceGroup) -> Vec<&Source> {
        match group {
            SourceGroup::News => self.news.iter().collect(),
            SourceGroup::Social => self.social.iter().collect(),
            SourceGroup::All => self.all().collect(),
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &Source> {
        self.news.iter().chain(&self.social)
    }

    pub fn find(&self, id: &str) -> Option<&Source> {
        self.all().find(|source| source.id == id)
    }

    /// Look up each of `ids`, failing on the first unknown one.
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<&Source>, AggregatorError> {
        ids.iter()
            .map(|id| {
                self.find(id.as_ref())
                    .ok_or_else(|| AggregatorError::SourceNotFound(id.as_ref().to_string()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.news.len() + self.social.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The deployed dashboard's outlets.
    pub fn builtin() -> Self {
        let news = vec![
            Source::new("wam", "WAM", "#00843D", "🇦🇪", vec![
                "https://www.wam.ae/en/rss/all".to_string(),
                "https://wam.ae/en/rss/all".to_string(),
                "https://www.wam.ae/en/rss".to_string(),
                google_news_search("site:wam.ae", "en"),
            ]),
            Source::new("aletihad", "Al Etihad", "#1B4F72", "📰", vec![
                google_news_search("site:aletihad.ae", "ar"),
            ]),
            Source::new("alkhaleej", "Al Khaleej", "#C0392B", "📜", vec![
                google_news_search("site:alkhaleej.ae", "ar"),
            ]),
            Source::new("thenational", "The National News", "#003B5C", "🏛️", vec![
                "https://www.thenationalnews.com/arc/outboundfeeds/rss/?outputType=xml".to_string(),
                "https://www.thenationalnews.com/rss".to_string(),
                google_news_search("site:thenationalnews.com", "en"),
            ]),
            Source::new("albayan", "Al Bayan", "#2E86C1", "🗞️", vec![
                google_news_search("site:albayan.ae", "ar"),
            ]),
            Source::new("alarabiya", "Al Arabiya", "#F47920", "🌐", vec![
                google_news_search("site:alarabiya.net", "en"),
                google_news_search("site:alarabiya.net", "ar"),
            ]),
            Source::new("skynews-arabia", "Sky News Arabia", "#0072CE", "🌍", vec![
                "https://www.skynewsarabia.com/web/rss".to_string(),
                "https://www.skynewsarabia.com/rss".to_string(),
                google_news_search("site:skynewsarabia.com breaking", "ar"),
                google_news_search("site:skynewsarabia.com", "ar"),
            ]),
            Source::new("asharqalawsat", "Asharq Al-Awsat", "#8B0000", "📰", vec![
                "https://aawsat.com/feed".to_string(),
                "https://aawsat.com/feed/rss".to_string(),
                "https://english.aawsat.com/feed".to_string(),
                google_news_search("site:aawsat.com", "en"),
            ]),
            Source::new("bbc", "BBC News", "#BB1919", "📺", vec![
                "https://feeds.bbci.co.uk/news/rss.xml".to_string(),
                "https://feeds.bbci.co.uk/news/world/rss.xml".to_string(),
            ]),
            Source::new("cnn", "CNN International", "#CC0000", "🔴", vec![
                google_news_search("site:edition.cnn.com OR site:cnn.com", "en"),
                google_news_search_regional("site:cnn.com", "en", "US"),
            ]),
            Source::new("skynews", "Sky News", "#951B32", "🌤️", vec![
                "https://feeds.skynews.com/feeds/rss/home.xml".to_string(),
                "https://news.sky.com/feeds/rss/home.xml".to_string(),
            ]),
            Source::new("reuters", "Reuters", "#FF8000", "⚡", vec![
                google_news_search("site:reuters.com", "en"),
            ]),
            Source::new("afp", "AFP", "#005BAA", "🔵", vec![
                google_news_search("source:AFP", "en"),
                google_news_search("site:afp.com", "en"),
            ]),
            Source::new("ft", "Financial Times", "#FCD0B1", "💹", vec![
                "https://www.ft.com/rss/home".to_string(),
                "https://www.ft.com/rss/home/uk".to_string(),
            ]),
            Source::new("economist", "The Economist", "#E3120B", "📊", vec![
                "https://www.economist.com/latest/rss.xml".to_string(),
                "https://www.economist.com/rss".to_string(),
                google_news_search("site:economist.com", "en"),
            ]),
        ];

        let social = vec![
            Source::new("x-trending", "Trending on X - UAE", "#000000", "𝕏", vec![
                google_news_search_regional(
                    r#"UAE OR Dubai OR "Abu Dhabi" trending twitter OR X"#,
                    "en",
                    "AE",
                ),
                google_news_search(r#""trending in UAE" OR "viral UAE" twitter"#, "en"),
            ])
            .on_platform("x"),
            Source::new("tiktok-trending", "Trending on TikTok - UAE", "#00F2EA", "🎵", vec![
                google_news_search_regional(r#"tiktok Dubai OR UAE OR "Abu Dhabi""#, "en", "AE"),
                google_news_search("tiktok trending Dubai OR UAE viral", "en"),
                google_news_search(r#"tiktok "United Arab Emirates" OR Dubai"#, "en"),
            ])
            .on_platform("tiktok"),
            Source::new("instagram-trending", "Trending on Instagram - UAE", "#E1306C", "📸", vec![
                google_news_search_regional(
                    r#"UAE OR Dubai OR "Abu Dhabi" instagram trending OR viral"#,
                    "en",
                    "AE",
                ),
                google_news_search(r#""instagram UAE" OR "instagram Dubai" trending"#, "en"),
            ])
            .on_platform("instagram"),
        ];

        Self { news, social }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_is_valid() {
        let registry = SourceRegistry::builtin();
        registry.validate().unwrap();
        assert_eq!(registry.news.len(), 15);
        assert_eq!(registry.social.len(), 3);
        assert!(registry.social.iter().all(|s| s.platform.is_some()));
        assert!(registry.news.iter().all(|s| s.platform.is_none()));
    }

    #[test]
    fn test_group_order_and_lookup() {
        let registry = SourceRegistry::builtin();
        let all: Vec<&str> = registry
            .group(SourceGroup::All)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(all.first(), Some(&"wam"));
        assert_eq!(all.last(), Some(&"instagram-trending"));
        assert_eq!(all.len(), registry.len());

        assert_eq!(registry.find("bbc").map(|s| s.name.as_str()), Some("BBC News"));
        assert!(registry.find("nope").is_none());

        let picked: Vec<&str> = registry
            .select(&["ft", "x-trending"])
            .unwrap()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(picked, vec!["ft", "x-trending"]);
        assert!(matches!(
            registry.select(&["ft", "nope"]),
            Err(AggregatorError::SourceNotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_google_news_search_urls() {
        assert_eq!(
            google_news_search("site:reuters.com", "en"),
            "https://news.google.com/rss/search?q=site%3Areuters.com&hl=en"
        );
        assert_eq!(
            google_news_search_regional("site:cnn.com", "en", "US"),
            "https://news.google.com/rss/search?q=site%3Acnn.com&hl=en&gl=US&ceid=US%3Aen"
        );
        assert!(google_news_search(r#""viral UAE" OR x"#, "en").contains("%22viral%20UAE%22%20OR%20x"));
    }

    #[test]
    fn test_yaml_registry() {
        let yaml = r##"
news:
  - id: bbc
    name: BBC News
    color: "#BB1919"
    icon: "📺"
    feeds:
      - https://feeds.bbci.co.uk/news/rss.xml
"##;
        let registry = SourceRegistry::from_yaml_str(yaml).unwrap();
        assert_eq!(registry.news.len(), 1);
        assert!(registry.social.is_empty());
    }

    #[test]
    fn test_yaml_registry_rejects_duplicates_and_empty_feeds() {
        let duplicate = r##"
news:
  - { id: bbc, name: A, color: "#000", icon: a, feeds: ["https://a.test/rss"] }
social:
  - { id: bbc, name: B, color: "#000", icon: b, feeds: ["https://b.test/rss"] }
"##;
        assert!(matches!(
            SourceRegistry::from_yaml_str(duplicate),
            Err(AggregatorError::InvalidConfig(msg)) if msg.contains("duplicate")
        ));

        let empty = r##"
news:
  - { id: bbc, name: A, color: "#000", icon: a, feeds: [] }
"##;
        assert!(matches!(
            SourceRegistry::from_yaml_str(empty),
            Err(AggregatorError::InvalidConfig(_))
        ));

        assert!(matches!(
            SourceRegistry::from_yaml_str("news: 12"),
            Err(AggregatorError::Config(_))
        ));
    }

    #[test]
    fn test_group_display_matches_value_names() {
        for group in [SourceGroup::News, SourceGroup::Social, SourceGroup::All] {
            let parsed = SourceGroup::from_str(&group.to_string(), false).unwrap();
            assert_eq!(parsed, group);
        }
    }
}
