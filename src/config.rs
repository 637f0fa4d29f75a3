//! Run configuration for geoip-nft.
//!
//! There is no configuration file: every value is a fixed constant, and the
//! command line can only redirect output or switch the archive source.

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::validation::validate_source_url;

/// GeoLite2 country database redistribution
pub const DEFAULT_SOURCE_URL: &str = "https://github.com/GitSquared/node-geolite2-redist/raw/refs/heads/master/redist/GeoLite2-Country.tar.gz";

/// HTTP request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum compressed download size (1024 MB)
pub const MAX_DOWNLOAD_SIZE: u64 = 1024 * 1024 * 1024;

/// Maximum declared size of the database entry inside the archive (1024 MB)
pub const MAX_DATABASE_SIZE: u64 = 1024 * 1024 * 1024;

/// Suffix identifying the database payload inside the archive
pub const DATABASE_SUFFIX: &str = ".mmdb";

/// Directory (under the output root) holding per-country files
pub const BY_COUNTRY_DIR: &str = "by_country";

pub const DIR_PERMISSIONS: u32 = 0o755;
pub const FILE_PERMISSIONS: u32 = 0o644;

/// Where the compressed archive comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    /// Download over HTTPS
    Remote(String),
    /// Read a local `.tar.gz` file
    Local(PathBuf),
}

/// Settings for one generation run
#[derive(Debug, Clone)]
pub struct Config {
    pub source: ArchiveSource,
    pub timeout: Duration,
    pub max_download_size: u64,
    pub max_database_size: u64,
    pub database_suffix: String,
    /// Root directory for generated files
    pub output_dir: PathBuf,
    /// Fetch and aggregate without writing any file
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: ArchiveSource::Remote(DEFAULT_SOURCE_URL.to_string()),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            max_download_size: MAX_DOWNLOAD_SIZE,
            max_database_size: MAX_DATABASE_SIZE,
            database_suffix: DATABASE_SUFFIX.to_string(),
            output_dir: PathBuf::from("."),
            dry_run: false,
        }
    }
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if let ArchiveSource::Remote(url) = &self.source {
            validate_source_url(url)?;
        }

        if self.timeout.is_zero() {
            bail!("Request timeout must be greater than zero");
        }

        if self.max_download_size == 0 || self.max_database_size == 0 {
            bail!("Size limits must be greater than zero");
        }

        if self.database_suffix.is_empty() {
            bail!("Database suffix cannot be empty");
        }

        Ok(())
    }

    /// Directory holding the per-country subdirectories
    pub fn by_country_dir(&self) -> PathBuf {
        self.output_dir.join(BY_COUNTRY_DIR)
    }
}
