//! Streaming extraction of the database payload from a `.tar.gz` archive.
//!
//! The gzip stream is decoded on the fly while tar entries are walked in
//! order. Extraction stops at the first safe regular file whose name ends
//! with the payload suffix; later entries are never read.

use flate2::read::GzDecoder;
use std::io::Read;
use tracing::{debug, info, warn};

use crate::error::ExtractError;
use crate::utils::format_bytes;
use crate::validation::is_safe_archive_path;

/// Options for locating the payload inside the archive
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// File name suffix of the payload (e.g. `.mmdb`)
    pub suffix: String,
    /// Maximum declared size of the payload entry
    pub max_size: u64,
}

/// Decompress `reader` as gzip and return the bytes of the payload entry
pub fn extract_database<R: Read>(
    reader: R,
    options: &ExtractOptions,
) -> Result<Vec<u8>, ExtractError> {
    extract_from_tar(GzDecoder::new(reader), options)
}

/// Walk an uncompressed tar stream and return the bytes of the payload entry
pub fn extract_from_tar<R: Read>(
    reader: R,
    options: &ExtractOptions,
) -> Result<Vec<u8>, ExtractError> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries()? {
        let entry = entry?;

        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

        // Path check runs before the name is used for anything else
        if !is_safe_archive_path(&name) {
            warn!("Skipping unsafe archive entry: {}", name);
            continue;
        }

        if !entry.header().entry_type().is_file() || !name.ends_with(&options.suffix) {
            debug!("Skipping archive entry: {}", name);
            continue;
        }

        let size = entry.size();
        if size > options.max_size {
            return Err(ExtractError::TooLarge {
                size,
                max: options.max_size,
            });
        }

        let mut data = Vec::with_capacity(size as usize);
        entry.take(size).read_to_end(&mut data)?;
        if (data.len() as u64) < size {
            return Err(ExtractError::Truncated {
                expected: size,
                read: data.len() as u64,
            });
        }

        info!("Extracted {} ({})", name, format_bytes(size));
        return Ok(data);
    }

    Err(ExtractError::NotFound(options.suffix.clone()))
}
