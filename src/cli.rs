//! CLI argument parsing with clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{ArchiveSource, Config};

#[derive(Parser, Debug)]
#[command(name = "geoip-nft")]
#[command(author, version, about = "Generate nftables GeoIP sets from the GeoLite2 country database")]
pub struct Cli {
    /// Directory to write geoip_*.nft and by_country/ into
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Read the .tar.gz archive from a local file instead of downloading it
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Dry-run mode: fetch and aggregate but don't write any file
    #[arg(long)]
    pub dry_run: bool,

    /// Quiet mode (for cron/systemd timer)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Build the run configuration from the fixed defaults and these flags
    pub fn to_config(&self) -> Config {
        let mut config = Config {
            output_dir: self.output_dir.clone(),
            dry_run: self.dry_run,
            ..Config::default()
        };
        if let Some(path) = &self.archive {
            config.source = ArchiveSource::Local(path.clone());
        }
        config
    }
}
