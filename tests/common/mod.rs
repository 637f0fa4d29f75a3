//! Shared helpers: a minimal MaxMind DB writer and archive builder.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use ipnet::IpNet;
use std::io::Write;

const METADATA_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

#[derive(Clone, Copy)]
enum Slot {
    Empty,
    Node(usize),
    Data(usize),
}

/// Builds a small MaxMind DB with 24-bit records
pub struct MmdbBuilder {
    ip_version: u16,
    nodes: Vec<[Slot; 2]>,
    data: Vec<u8>,
}

impl MmdbBuilder {
    pub fn new(ip_version: u16) -> Self {
        Self {
            ip_version,
            nodes: vec![[Slot::Empty, Slot::Empty]],
            data: Vec::new(),
        }
    }

    fn width(&self) -> u32 {
        if self.ip_version == 6 {
            128
        } else {
            32
        }
    }

    /// Tree position of a network: IPv4 lands in `::/96` for IPv6 databases
    fn bits_of(&self, network: &str) -> (u128, u32) {
        match network.parse::<IpNet>().unwrap() {
            IpNet::V4(v4) if self.ip_version == 6 => {
                (u32::from(v4.network()) as u128, 96 + v4.prefix_len() as u32)
            }
            IpNet::V4(v4) => (u32::from(v4.network()) as u128, v4.prefix_len() as u32),
            IpNet::V6(v6) => {
                assert_eq!(self.ip_version, 6, "IPv6 network in IPv4 database");
                (u128::from(v6.network()), v6.prefix_len() as u32)
            }
        }
    }

    fn insert_slot(&mut self, addr: u128, len: u32, slot: Slot) {
        assert!(len >= 1);
        let width = self.width();
        let mut node = 0;
        for i in 0..len {
            let bit = ((addr >> (width - 1 - i)) & 1) as usize;
            if i == len - 1 {
                self.nodes[node][bit] = slot;
            } else {
                node = match self.nodes[node][bit] {
                    Slot::Node(n) => n,
                    Slot::Empty => {
                        let n = self.nodes.len();
                        self.nodes.push([Slot::Empty, Slot::Empty]);
                        self.nodes[node][bit] = Slot::Node(n);
                        n
                    }
                    Slot::Data(_) => panic!("overlapping network"),
                };
            }
        }
    }

    /// Store an encoded record under `network`
    pub fn insert(&mut self, network: &str, record: Vec<u8>) -> &mut Self {
        let offset = self.data.len();
        self.data.extend(record);
        let (addr, len) = self.bits_of(network);
        self.insert_slot(addr, len, Slot::Data(offset));
        self
    }

    /// Point an IPv6 network at the IPv4 subtree, like MaxMind's aliases
    pub fn alias_ipv4(&mut self, network: &str) -> &mut Self {
        let mut node = 0;
        for _ in 0..96 {
            node = match self.nodes[node][0] {
                Slot::Node(n) => n,
                _ => panic!("IPv4 subtree must exist before aliasing"),
            };
        }
        let (addr, len) = self.bits_of(network);
        self.insert_slot(addr, len, Slot::Node(node));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let node_count = self.nodes.len();
        let value = |slot: Slot| -> u32 {
            match slot {
                Slot::Empty => node_count as u32,
                Slot::Node(n) => n as u32,
                Slot::Data(offset) => (node_count + 16 + offset) as u32,
            }
        };

        let mut out = Vec::new();
        for [left, right] in &self.nodes {
            out.extend_from_slice(&value(*left).to_be_bytes()[1..]);
            out.extend_from_slice(&value(*right).to_be_bytes()[1..]);
        }
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&self.data);

        out.extend_from_slice(METADATA_MARKER);
        out.extend(map(vec![
            ("binary_format_major_version", uint(5, 2)),
            ("binary_format_minor_version", uint(5, 0)),
            ("build_epoch", uint(9, 1_700_000_000)),
            ("database_type", string("GeoLite2-Country")),
            ("description", map(vec![("en", string("test database"))])),
            ("ip_version", uint(5, self.ip_version as u64)),
            ("languages", array(vec![string("en")])),
            ("node_count", uint(6, node_count as u64)),
            ("record_size", uint(5, 24)),
        ]));
        out
    }
}

fn control(type_num: u8, size: usize, out: &mut Vec<u8>) {
    assert!(size < 29);
    if type_num <= 7 {
        out.push((type_num << 5) | size as u8);
    } else {
        out.push(size as u8);
        out.push(type_num - 7);
    }
}

pub fn string(s: &str) -> Vec<u8> {
    let mut out = Vec::new();
    control(2, s.len(), &mut out);
    out.extend_from_slice(s.as_bytes());
    out
}

pub fn map(entries: Vec<(&str, Vec<u8>)>) -> Vec<u8> {
    let mut out = Vec::new();
    control(7, entries.len(), &mut out);
    for (key, value) in entries {
        out.extend(string(key));
        out.extend(value);
    }
    out
}

pub fn array(items: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = Vec::new();
    control(11, items.len(), &mut out);
    for item in items {
        out.extend(item);
    }
    out
}

fn uint(type_num: u8, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let mut out = Vec::new();
    control(type_num, bytes.len() - start, &mut out);
    out.extend_from_slice(&bytes[start..]);
    out
}

/// `{ country: { iso_code: code } }`
pub fn country_record(code: &str) -> Vec<u8> {
    map(vec![("country", map(vec![("iso_code", string(code))]))])
}

/// A record whose `country` is not a map
pub fn malformed_record() -> Vec<u8> {
    map(vec![("country", string("US"))])
}

/// Gzipped tar archive with the given entries
pub fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, *data).unwrap();
    }
    let tar_bytes = builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).unwrap();
    encoder.finish().unwrap()
}
