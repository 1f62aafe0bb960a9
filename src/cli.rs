//! Command-line interface definitions for the feed dashboard resolver.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most options can also be provided via environment variables.

use clap::Parser;
use feed_dashboard::{ResolverSettings, SourceGroup};
use std::time::Duration;

/// Command-line arguments for the feed dashboard resolver.
///
/// By default one pass over the `news` group is printed to stdout as a batch
/// envelope. With `--interval-secs` the process keeps polling, and the cache
/// serves sources that are still fresh between rounds.
///
/// # Examples
///
/// ```sh
/// # Every news source, once, to stdout
/// feed_dashboard
///
/// # Social trends, written to ./json/social.json every minute
/// feed_dashboard --group social -j ./json --interval-secs 60
///
/// # Two specific sources from a custom registry
/// feed_dashboard -c sources.yaml -s bbc -s reuters
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Source group to resolve
    #[arg(short, long, value_enum, default_value_t = SourceGroup::News)]
    pub group: SourceGroup,

    /// Resolve only these source ids (repeatable); overrides --group
    #[arg(short, long = "source")]
    pub sources: Vec<String>,

    /// Ignore cached results on the first round
    #[arg(short, long)]
    pub refresh: bool,

    /// Optional path to a YAML source registry (replaces the built-in list)
    #[arg(short, long, env = "FEED_DASHBOARD_SOURCES")]
    pub config: Option<String>,

    /// Directory for batch JSON files; prints to stdout when absent
    #[arg(short, long, env = "FEED_DASHBOARD_JSON_DIR")]
    pub json_output_dir: Option<String>,

    /// Keep polling with this many seconds between rounds
    #[arg(short, long, env = "FEED_DASHBOARD_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,

    /// Never fall back to screenshot thumbnails for image-less articles
    #[arg(long)]
    pub no_screenshot_fallback: bool,

    /// Timeout for each feed fetch, in seconds
    #[arg(long, env = "FEED_DASHBOARD_FEED_TIMEOUT_SECS", default_value_t = 10)]
    pub feed_timeout_secs: u64,
}

impl Cli {
    /// Resolver settings with the CLI overrides applied.
    pub fn settings(&self) -> ResolverSettings {
        ResolverSettings {
            feed_timeout: Duration::from_secs(self.feed_timeout_secs),
            screenshot_fallback: !self.no_screenshot_fallback,
            ..ResolverSettings::default()
        }
    }

    /// Name of the batch written each round: the group, or `selection`.
    pub fn batch_name(&self) -> String {
        if self.sources.is_empty() {
            self.group.to_string()
        } else {
            "selection".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["feed_dashboard"]);

        assert_eq!(cli.group, SourceGroup::News);
        assert!(cli.sources.is_empty());
        assert!(!cli.refresh);
        assert!(cli.json_output_dir.is_none());
        assert!(cli.interval_secs.is_none());
        assert_eq!(cli.batch_name(), "news");

        let settings = cli.settings();
        assert_eq!(settings.feed_timeout, Duration::from_secs(10));
        assert!(settings.screenshot_fallback);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "feed_dashboard",
            "--group",
            "social",
            "--json-output-dir",
            "./json",
            "--refresh",
            "--no-screenshot-fallback",
            "--feed-timeout-secs",
            "15",
        ]);

        assert_eq!(cli.group, SourceGroup::Social);
        assert_eq!(cli.json_output_dir.as_deref(), Some("./json"));
        assert!(cli.refresh);
        let settings = cli.settings();
        assert_eq!(settings.feed_timeout, Duration::from_secs(15));
        assert!(!settings.screenshot_fallback);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "feed_dashboard",
            "-s",
            "bbc",
            "-s",
            "reuters",
            "-c",
            "/tmp/sources.yaml",
            "-i",
            "60",
        ]);

        assert_eq!(cli.sources, vec!["bbc", "reuters"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/sources.yaml"));
        assert_eq!(cli.interval_secs, Some(60));
        assert_eq!(cli.batch_name(), "selection");
    }

    #[test]
    fn test_cli_rejects_unknown_group() {
        assert!(Cli::try_parse_from(["feed_dashboard", "--group", "sports"]).is_err());
    }
}
