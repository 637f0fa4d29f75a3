//! The generation run: fetch, extract, decode, aggregate, write.
//!
//! Stages run strictly in order. Any stage failure aborts the run with the
//! stage named in the error chain.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::aggregator::{aggregate, AggregationStats, CountryBuckets};
use crate::config::{ArchiveSource, Config};
use crate::decoder::Database;
use crate::error::{DecodeError, FetchError};
use crate::extractor::{extract_database, ExtractOptions};
use crate::fetcher::{read_local, Fetcher};
use crate::utils::format_count;
use crate::writer::{SetFileWriter, WriteSummary};

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: AggregationStats,
    /// `None` for dry runs
    pub files: Option<WriteSummary>,
}

/// Run the whole conversion
pub async fn run(config: &Config) -> Result<RunSummary> {
    config.validate().context("Invalid configuration")?;

    let archive = load_archive(config)
        .await
        .context("Failed to download database archive")?;

    let options = ExtractOptions {
        suffix: config.database_suffix.clone(),
        max_size: config.max_database_size,
    };
    let database = extract_database(archive.as_slice(), &options)
        .context("Failed to extract database")?;
    drop(archive);

    let (buckets, stats) = load_buckets(database).context("Failed to load GeoIP data")?;

    info!(
        "Loaded {} IPv4 prefixes ({} countries) and {} IPv6 prefixes ({} countries)",
        format_count(stats.ipv4_prefixes),
        buckets.ipv4().len(),
        format_count(stats.ipv6_prefixes),
        buckets.ipv6().len()
    );
    if stats.skipped() > 0 {
        warn!(
            "Skipped {} records ({} invalid country code, {} undecodable)",
            format_count(stats.skipped()),
            format_count(stats.invalid_country),
            format_count(stats.undecodable)
        );
    }

    if config.dry_run {
        info!("Dry run: no files written");
        return Ok(RunSummary { stats, files: None });
    }

    let files = SetFileWriter::from_config(config)
        .write_all(&buckets)
        .context("Failed to generate files")?;

    info!("Wrote {} files", format_count(files.total()));

    Ok(RunSummary {
        stats,
        files: Some(files),
    })
}

/// Get the compressed archive bytes from the configured source
async fn load_archive(config: &Config) -> Result<Vec<u8>, FetchError> {
    match &config.source {
        ArchiveSource::Remote(url) => {
            let fetcher = Fetcher::new(config.timeout, config.max_download_size)?;
            fetcher.fetch(url).await
        }
        ArchiveSource::Local(path) => read_local(path, config.max_download_size),
    }
}

/// Open the database, bucket every network, and release the database
pub fn load_buckets(
    database: Vec<u8>,
) -> Result<(CountryBuckets, AggregationStats), DecodeError> {
    let database = Database::open(database)?;
    let networks = database.networks()?;
    Ok(aggregate(networks))
}
