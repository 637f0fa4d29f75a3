//! MaxMind DB record decoding.
//!
//! Opens the extracted database from memory and walks every network that
//! carries data. Entries whose data does not decode as a country record are
//! reported as [`SkippedRecord`] so the caller can drop them and move on.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use maxminddb::Reader;
use serde::Deserialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use tracing::info;

use crate::error::DecodeError;
use crate::utils::format_bytes;

/// Country part of a GeoIP2/GeoLite2 record
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub iso_code: String,
}

/// The subset of a database record needed for bucketing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CountryRecord {
    #[serde(default)]
    pub country: Country,
}

impl CountryRecord {
    pub fn with_iso_code(code: &str) -> Self {
        Self {
            country: Country {
                iso_code: code.to_string(),
            },
        }
    }

    pub fn iso_code(&self) -> &str {
        &self.country.iso_code
    }
}

/// A database entry that could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct SkippedRecord {
    reason: String,
}

impl SkippedRecord {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// One network from the database, or the reason it was unusable
pub type DecodedEntry = Result<(IpNet, CountryRecord), SkippedRecord>;

/// In-memory MaxMind database
pub struct Database {
    reader: Reader<Vec<u8>>,
}

impl Database {
    /// Open a database from its raw bytes
    pub fn open(bytes: Vec<u8>) -> Result<Self, DecodeError> {
        let size = bytes.len() as u64;
        let reader = Reader::from_source(bytes).map_err(|e| DecodeError::Open(e.to_string()))?;

        info!(
            "Opened {} database ({}, IPv{}, {} nodes)",
            reader.metadata.database_type,
            format_bytes(size),
            reader.metadata.ip_version,
            reader.metadata.node_count
        );

        Ok(Self { reader })
    }

    pub fn ip_version(&self) -> u16 {
        self.reader.metadata.ip_version
    }

    /// Lazily walk every network holding data, in tree order.
    ///
    /// For IPv6 databases the embedded IPv4 subtree comes out as IPv4
    /// prefixes and the IPv4 alias ranges are left out.
    pub fn networks(&self) -> Result<impl Iterator<Item = DecodedEntry> + '_, DecodeError> {
        let root = if self.ip_version() == 6 {
            Ipv6Network::new(Ipv6Addr::UNSPECIFIED, 0).map(IpNetwork::V6)
        } else {
            Ipv4Network::new(Ipv4Addr::UNSPECIFIED, 0).map(IpNetwork::V4)
        }
        .map_err(|e| DecodeError::Iterate(e.to_string()))?;

        let within = self
            .reader
            .within::<CountryRecord>(root)
            .map_err(|e| DecodeError::Iterate(e.to_string()))?;

        Ok(within.filter_map(|item| match item {
            Ok(item) => {
                let net = match IpNet::new(item.ip_net.ip(), item.ip_net.prefix()) {
                    Ok(net) => net.trunc(),
                    Err(e) => return Some(Err(SkippedRecord::new(e.to_string()))),
                };
                normalize_network(net).map(|net| Ok((net, item.info)))
            }
            Err(e) => Some(Err(SkippedRecord::new(e.to_string()))),
        }))
    }
}

/// Whether `net` sits in a range MaxMind aliases onto the IPv4 subtree
fn is_ipv4_alias(net: &Ipv6Net) -> bool {
    let segments = net.network().segments();
    let prefix_len = net.prefix_len();

    // IPv4-mapped ::ffff:0:0/96
    let mapped =
        prefix_len >= 96 && segments[..5].iter().all(|&s| s == 0) && segments[5] == 0xffff;
    // Teredo 2001::/32
    let teredo = prefix_len >= 32 && segments[0] == 0x2001 && segments[1] == 0;
    // 6to4 2002::/16
    let six_to_four = prefix_len >= 16 && segments[0] == 0x2002;

    mapped || teredo || six_to_four
}

/// Map a network from the tree onto the prefix it stands for.
///
/// `::a.b.c.d/(96+n)` becomes `a.b.c.d/n`; anything inside an IPv4 alias
/// range yields `None`; everything else is returned unchanged.
pub fn normalize_network(net: IpNet) -> Option<IpNet> {
    let v6 = match net {
        IpNet::V4(_) => return Some(net),
        IpNet::V6(v6) => v6,
    };

    let octets = v6.network().octets();
    if v6.prefix_len() >= 96 && octets[..12].iter().all(|&b| b == 0) {
        let addr = Ipv4Addr::new(octets[12], octets[13], octets[14], octets[15]);
        return Ipv4Net::new(addr, v6.prefix_len() - 96).ok().map(IpNet::V4);
    }

    if is_ipv4_alias(&v6) {
        return None;
    }

    Some(net)
}
