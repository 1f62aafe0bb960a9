//! # Feed Dashboard
//!
//! Command-line driver for the feed resolution pipeline: resolves a group of
//! sources (or an explicit selection) and emits the JSON envelope the
//! dashboard front end reads.
//!
//! ## Usage
//!
//! ```sh
//! feed_dashboard --group news -j ./json --interval-secs 60
//! ```
//!
//! ## Flow
//!
//! 1. **Setup**: tracing, CLI, source registry, shared cache and HTTP client
//! 2. **Round**: resolve the requested sources concurrently
//! 3. **Output**: write `{dir}/{batch}.json` or print to stdout
//! 4. **Repeat**: with `--interval-secs`, sleep and run another round

use clap::Parser;
use feed_dashboard::outputs::json;
use feed_dashboard::utils::ensure_writable_dir;
use feed_dashboard::{
    AggregatorError, Cache, ErrorResponse, HttpFetcher, Orchestrator, SourceRegistry,
    SourceResolver, SourceResponse,
};
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    info!("feed_dashboard starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = args.json_output_dir.as_deref() {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let registry = match args.config.as_deref() {
        Some(path) => SourceRegistry::load(path).await?,
        None => SourceRegistry::builtin(),
    };
    info!(sources = registry.len(), "Source registry ready");

    let settings = args.settings();
    let cache = Arc::new(Cache::new(settings.cache_ttl));
    let fetcher = Arc::new(HttpFetcher::new()?);
    let resolver = Arc::new(SourceResolver::new(fetcher, cache, settings));
    let orchestrator = Orchestrator::new(Arc::new(registry), resolver);

    let mut force_refresh = args.refresh;
    loop {
        let start_time = std::time::Instant::now();
        run_round(&orchestrator, &args, force_refresh).await?;
        let elapsed = start_time.elapsed();
        info!(?elapsed, millis = elapsed.as_millis() as u64, "Round complete");

        let Some(interval) = args.interval_secs else {
            break;
        };
        force_refresh = false;
        tokio::time::sleep(Duration::from_secs(interval)).await;
    }

    Ok(())
}

/// Resolve one round and emit it.
///
/// A single `--source` produces a [`SourceResponse`]; several produce a batch
/// envelope; none resolves `--group`. Unknown ids emit an [`ErrorResponse`]
/// and end the run.
#[instrument(level = "info", skip_all, fields(force_refresh))]
async fn run_round(
    orchestrator: &Orchestrator,
    args: &Cli,
    force_refresh: bool,
) -> Result<(), Box<dyn Error>> {
    match args.sources.as_slice() {
        [] => {
            let batch = orchestrator.resolve_group(args.group, force_refresh).await;
            emit(&batch, args, &args.batch_name()).await
        }
        [id] => match orchestrator.resolve_one(id, force_refresh).await {
            Ok(data) => emit(&SourceResponse { success: true, data }, args, id).await,
            Err(e) => fail(e, args).await,
        },
        ids => match orchestrator.resolve_ids(ids, force_refresh).await {
            Ok(batch) => emit(&batch, args, &args.batch_name()).await,
            Err(e) => fail(e, args).await,
        },
    }
}

/// Emit the error envelope for `e`, then hand `e` back to end the run.
async fn fail(e: AggregatorError, args: &Cli) -> Result<(), Box<dyn Error>> {
    error!(error = %e, "Round failed");
    emit(&ErrorResponse::from(&e), args, "error").await?;
    Err(e.into())
}

/// Write `response` to the output directory, or print it when none is set.
async fn emit<T: Serialize>(response: &T, args: &Cli, name: &str) -> Result<(), Box<dyn Error>> {
    match args.json_output_dir.as_deref() {
        Some(dir) => {
            json::write_response(response, dir, name).await?;
        }
        None => println!("{}", serde_json::to_string_pretty(response)?),
    }
    Ok(())
}
