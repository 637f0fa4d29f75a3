//! Centralized validation functions for geoip-nft.
//!
//! This module provides validation for:
//! - ISO 3166-1 alpha-2 country codes coming out of the database
//! - Archive entry paths (path traversal protection)
//! - Source URLs

use anyhow::{bail, Result};
use std::path::{Component, Path};

/// Check that a country code is exactly two ASCII uppercase letters.
///
/// # Examples
/// ```
/// use geoip_nft::validation::is_valid_country_code;
/// assert!(is_valid_country_code("US"));
/// assert!(!is_valid_country_code("us"));
/// assert!(!is_valid_country_code("USA"));
/// assert!(!is_valid_country_code(""));
/// ```
pub fn is_valid_country_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())
}

/// Check that an archive entry path stays inside the extraction root.
///
/// Rejects absolute paths (leading `/` or `\`, drive prefixes) and any path
/// with a `..` segment. `.` segments are ignored.
///
/// # Examples
/// ```
/// use geoip_nft::validation::is_safe_archive_path;
/// assert!(is_safe_archive_path("GeoLite2-Country_20240101/GeoLite2-Country.mmdb"));
/// assert!(!is_safe_archive_path("../evil.mmdb"));
/// assert!(!is_safe_archive_path("/etc/evil.mmdb"));
/// ```
pub fn is_safe_archive_path(path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') || path.starts_with('\\') {
        return false;
    }

    // Backslash segments are not separators on unix, check them explicitly
    if path.split(&['/', '\\'][..]).any(|segment| segment == "..") {
        return false;
    }

    Path::new(path).components().all(|component| {
        matches!(component, Component::Normal(_) | Component::CurDir)
    })
}

/// Validate that a source URL uses HTTPS.
///
/// # Examples
/// ```
/// use geoip_nft::validation::validate_source_url;
/// assert!(validate_source_url("https://example.com/db.tar.gz").is_ok());
/// assert!(validate_source_url("http://example.com/db.tar.gz").is_err());
/// ```
pub fn validate_source_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        bail!("Source URL cannot be empty");
    }
    if !url.starts_with("https://") {
        bail!("Source URL must use HTTPS: {}", url);
    }
    Ok(())
}
