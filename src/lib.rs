//! # Feed Dashboard
//!
//! Turns a list of unreliable syndication endpoints into a clean, recent,
//! bounded article list per source for a news dashboard.
//!
//! ## Features
//!
//! - Several candidate feed URLs per source, tried in order
//! - Three cascading parse strategies per feed (extended RSS, basic XML, lenient patterns)
//! - Summary and image extraction with placeholder and logo rejection
//! - Aggregator (Google News) redirect resolution to the publisher URL
//! - Preview-image recovery from publisher pages, with a screenshot fallback
//! - A three-minute per-source cache and a bounded whole-source retry
//! - Concurrent batch resolution where one failing source never sinks the rest
//!
//! ## Architecture
//!
//! ```text
//! SourceRegistry ─▶ Orchestrator ─▶ SourceResolver ─▶ ParserChain ─▶ ArticleNormalizer
//!                                        │                                  │
//!                                        ├──────── Cache ◀──────────────────┤
//!                                        └── LinkResolver ─▶ ImageEnricher ◀┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use feed_dashboard::{Cache, HttpFetcher, Orchestrator, ResolverSettings, SourceGroup, SourceRegistry, SourceResolver};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ResolverSettings::default();
//! let cache = Arc::new(Cache::new(settings.cache_ttl));
//! let resolver = SourceResolver::new(Arc::new(HttpFetcher::new()?), cache, settings);
//! let orchestrator = Orchestrator::new(Arc::new(SourceRegistry::builtin()), Arc::new(resolver));
//!
//! let batch = orchestrator.resolve_group(SourceGroup::News, false).await;
//! println!("{}", serde_json::to_string_pretty(&batch)?);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod links;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod outputs;
pub mod parsers;
pub mod registry;
pub mod resolver;
pub mod scan;
pub mod settings;
pub mod utils;

pub use cache::Cache;
pub use enrich::{ImageEnricher, ImageProvider};
pub use error::{AggregatorError, FetchError};
pub use fetch::{FetchRequest, FetchedPage, Fetcher, HttpFetcher};
pub use links::LinkResolver;
pub use models::{
    BatchResponse, ErrorResponse, NormalizedArticle, RawFeedItem, ResolvedSource, Source,
    SourceResponse,
};
pub use normalize::ArticleNormalizer;
pub use orchestrator::Orchestrator;
pub use parsers::{FeedStrategy, ParserChain};
pub use registry::{SourceGroup, SourceRegistry};
pub use resolver::SourceResolver;
pub use settings::ResolverSettings;
