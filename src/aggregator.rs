//! Bucketing of decoded database records by country and address family.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::decoder::{CountryRecord, DecodedEntry};
use crate::validation::is_valid_country_code;

/// Validated ISO 3166-1 alpha-2 country code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse a country code, returning `None` unless it is two uppercase letters.
    ///
    /// # Examples
    /// ```
    /// use geoip_nft::aggregator::CountryCode;
    /// assert!(CountryCode::parse("DE").is_some());
    /// assert!(CountryCode::parse("de").is_none());
    /// ```
    pub fn parse(code: &str) -> Option<Self> {
        is_valid_country_code(code).then(|| Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Counters collected while bucketing
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AggregationStats {
    pub ipv4_prefixes: usize,
    pub ipv6_prefixes: usize,
    /// Records with a missing or malformed country code
    pub invalid_country: usize,
    /// Records whose data could not be decoded
    pub undecodable: usize,
}

impl AggregationStats {
    pub fn accepted(&self) -> usize {
        self.ipv4_prefixes + self.ipv6_prefixes
    }

    pub fn skipped(&self) -> usize {
        self.invalid_country + self.undecodable
    }
}

/// Prefixes per country, split by address family.
///
/// Prefixes keep the order the decoder produced them in. Countries iterate
/// in ascending code order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CountryBuckets {
    ipv4: BTreeMap<CountryCode, Vec<Ipv4Net>>,
    ipv6: BTreeMap<CountryCode, Vec<Ipv6Net>>,
}

impl CountryBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a prefix under `code`, classified by its address family
    pub fn insert(&mut self, code: CountryCode, net: IpNet) {
        match net {
            IpNet::V4(v4) => self.ipv4.entry(code).or_default().push(v4),
            IpNet::V6(v6) => self.ipv6.entry(code).or_default().push(v6),
        }
    }

    /// Add a decoded record, returning `false` if its country code is rejected
    pub fn add_record(&mut self, net: IpNet, record: &CountryRecord) -> bool {
        match CountryCode::parse(record.iso_code()) {
            Some(code) => {
                self.insert(code, net);
                true
            }
            None => false,
        }
    }

    pub fn ipv4(&self) -> &BTreeMap<CountryCode, Vec<Ipv4Net>> {
        &self.ipv4
    }

    pub fn ipv6(&self) -> &BTreeMap<CountryCode, Vec<Ipv6Net>> {
        &self.ipv6
    }

    /// Total number of prefixes across both families
    pub fn prefix_count(&self) -> usize {
        self.ipv4.values().map(Vec::len).sum::<usize>()
            + self.ipv6.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }
}

/// Bucket every decoded entry, silently skipping bad records.
///
/// No deduplication and no sorting of prefixes is performed.
pub fn aggregate<I>(entries: I) -> (CountryBuckets, AggregationStats)
where
    I: IntoIterator<Item = DecodedEntry>,
{
    let mut buckets = CountryBuckets::new();
    let mut stats = AggregationStats::default();

    for entry in entries {
        let (net, record) = match entry {
            Ok(pair) => pair,
            Err(skipped) => {
                debug!("Skipping undecodable record: {}", skipped);
                stats.undecodable += 1;
                continue;
            }
        };

        if !buckets.add_record(net, &record) {
            debug!(
                "Skipping {} with invalid country code {:?}",
                net,
                record.iso_code()
            );
            stats.invalid_country += 1;
            continue;
        }

        match net {
            IpNet::V4(_) => stats.ipv4_prefixes += 1,
            IpNet::V6(_) => stats.ipv6_prefixes += 1,
        }
    }

    (buckets, stats)
}
