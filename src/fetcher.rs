//! HTTP fetcher for downloading the database archive.
//!
//! A single attempt is made: any transport error or non-success status fails
//! the run. The body is read chunk by chunk and never grows past the size limit.

use reqwest::Client;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::utils::format_bytes;

/// HTTP client for fetching the archive
pub struct Fetcher {
    client: Client,
    max_size: u64,
}

impl Fetcher {
    /// Create a new fetcher with the given timeout and size ceiling
    pub fn new(timeout: Duration, max_size: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("geoip-nft/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, max_size })
    }

    /// Maximum number of bytes accepted from the remote
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Fetch the raw bytes behind `url`
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        info!("Downloading {}...", url);

        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        // Reject early when the server announces an oversized body
        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size {
                return Err(FetchError::TooLarge {
                    size: content_length,
                    max: self.max_size,
                });
            }
        }

        let capacity = response
            .content_length()
            .unwrap_or(0)
            .min(self.max_size) as usize;
        let mut body = Vec::with_capacity(capacity);

        while let Some(chunk) = response.chunk().await? {
            let new_len = body.len() as u64 + chunk.len() as u64;
            if new_len > self.max_size {
                return Err(FetchError::TooLarge {
                    size: new_len,
                    max: self.max_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Received HTTP {} from {}", status, url);
        info!("Downloaded {}", format_bytes(body.len() as u64));

        Ok(body)
    }
}

/// Read a local archive file, applying the same size ceiling as a download
pub fn read_local(path: &Path, max_size: u64) -> Result<Vec<u8>, FetchError> {
    info!("Reading archive {}...", path.display());

    let file = std::fs::File::open(path)?;
    let declared = file.metadata()?.len();
    if declared > max_size {
        return Err(FetchError::TooLarge {
            size: declared,
            max: max_size,
        });
    }

    let mut body = Vec::with_capacity(declared as usize);
    // One extra byte detects a file that grew after the metadata check
    file.take(max_size + 1).read_to_end(&mut body)?;
    if body.len() as u64 > max_size {
        return Err(FetchError::TooLarge {
            size: body.len() as u64,
            max: max_size,
        });
    }

    info!("Read {}", format_bytes(body.len() as u64));
    Ok(body)
}
