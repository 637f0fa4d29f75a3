//! Error types for geoip-nft.

use thiserror::Error;

/// Failures while retrieving the database archive.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Response too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Failed to read archive file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while decompressing or walking the archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Reading archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database file too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Database file truncated: expected {expected} bytes, read {read}")]
    Truncated { expected: u64, read: u64 },

    #[error("No file ending in {0} found in archive")]
    NotFound(String),
}

/// Failures opening or walking the structured database as a whole.
///
/// Individual records that fail to decode are skipped, never reported here.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Opening database: {0}")]
    Open(String),

    #[error("Iterating networks: {0}")]
    Iterate(String),
}
