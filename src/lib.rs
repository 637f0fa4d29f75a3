//! # geoip-nft - nftables GeoIP sets from the GeoLite2 country database
//!
//! Downloads the GeoLite2 country database, buckets every network by country
//! and address family, and writes nftables set definitions ready for `nft -f`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        geoip-nft                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fetcher (reqwest + rustls)                                 │
//! │    └── One bounded download of the .tar.gz archive          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Extractor (flate2 + tar)                                   │
//! │    └── Streaming gunzip, path checks, first .mmdb entry     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Decoder (maxminddb)                                        │
//! │    └── Every network with its country record                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Aggregator (ipnet)                                         │
//! │    └── Country code validation, IPv4/IPv6 buckets           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Writer                                                     │
//! │    ├── geoip_ipv4.nft, geoip_ipv6.nft                       │
//! │    └── by_country/<CC>/<CC>_ipv4.nft, <CC>_ipv6.nft         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use geoip_nft::config::Config;
//! use geoip_nft::pipeline;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let summary = pipeline::run(&Config::default()).await?;
//!     println!("{} prefixes", summary.stats.accepted());
//!     Ok(())
//! }
//! ```
//!
//! ## Security
//!
//! - **Download Limits** - the archive download and the database entry are size-limited
//! - **Path Traversal** - archive entries with `..` segments or absolute paths are skipped
//! - **HTTPS Only** - the remote source must use HTTPS
//!
//! ## Modules
//!
//! - [`aggregator`] - Country buckets and record validation
//! - [`cli`] - Command-line interface definitions
//! - [`config`] - Fixed limits and run configuration
//! - [`decoder`] - MaxMind DB network iteration
//! - [`error`] - Typed stage errors
//! - [`extractor`] - `.tar.gz` payload extraction
//! - [`fetcher`] - HTTP download of the archive
//! - [`pipeline`] - The end-to-end run
//! - [`utils`] - Formatting helpers
//! - [`validation`] - Country code, path and URL validation
//! - [`writer`] - nftables set-file generation

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod pipeline;
pub mod utils;
pub mod validation;
pub mod writer;

pub use cli::Cli;
pub use config::Config;
