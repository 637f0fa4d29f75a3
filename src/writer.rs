//! nftables set-file generation.
//!
//! Output layout under the output root:
//! - `geoip_ipv4.nft`, `geoip_ipv6.nft`: every country in one `inet geoip` table
//! - `by_country/<CC>/<CC>_ipv4.nft`, `by_country/<CC>/<CC>_ipv6.nft`: one set each
//!
//! The text is loaded verbatim with `nft -f`, so header, indentation and
//! separators must not change.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::{DirBuilder, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::aggregator::{CountryBuckets, CountryCode};
use crate::config::{Config, BY_COUNTRY_DIR, DIR_PERMISSIONS, FILE_PERMISSIONS};
use crate::utils::format_count;

const SHEBANG: &str = "#!/usr/sbin/nft -f";
const TABLE_HEADER: &str = "table inet geoip {";

/// Address family of a set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Short label used in file names
    pub fn label(self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "ipv4",
            AddressFamily::Ipv6 => "ipv6",
        }
    }

    /// nftables element type
    pub fn nft_type(self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "ipv4_addr",
            AddressFamily::Ipv6 => "ipv6_addr",
        }
    }

    pub fn global_file_name(self) -> String {
        format!("geoip_{}.nft", self.label())
    }

    pub fn country_file_name(self, code: &CountryCode) -> String {
        format!("{}_{}.nft", code, self.label())
    }
}

/// Render one `set` block for a country
pub fn render_set_block<T: Display>(
    code: &CountryCode,
    family: AddressFamily,
    prefixes: &[T],
) -> String {
    let elements: Vec<String> = prefixes.iter().map(ToString::to_string).collect();

    let mut block = String::new();
    block.push_str(&format!("    set {} {{\n", code));
    block.push_str(&format!("        type {}\n", family.nft_type()));
    block.push_str("        flags interval\n");
    block.push_str("        elements = { ");
    block.push_str(&elements.join(", "));
    block.push_str(" }\n");
    block.push_str("    }\n");
    block
}

/// Wrap rendered set blocks in the `inet geoip` table
pub fn render_table<I>(blocks: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut script = String::new();
    script.push_str(SHEBANG);
    script.push('\n');
    script.push_str(TABLE_HEADER);
    script.push('\n');
    for block in blocks {
        script.push_str(&block);
    }
    script.push_str("}\n");
    script
}

/// Render the table holding every country of one family, in code order
pub fn render_global<T: Display>(
    family: AddressFamily,
    countries: &BTreeMap<CountryCode, Vec<T>>,
) -> String {
    render_table(
        countries
            .iter()
            .filter(|(_, prefixes)| !prefixes.is_empty())
            .map(|(code, prefixes)| render_set_block(code, family, prefixes)),
    )
}

/// Files produced by one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub global_files: Vec<PathBuf>,
    pub country_files: Vec<PathBuf>,
}

impl WriteSummary {
    pub fn total(&self) -> usize {
        self.global_files.len() + self.country_files.len()
    }
}

/// Writes set files below an output root
pub struct SetFileWriter {
    output_dir: PathBuf,
    dir_mode: u32,
    file_mode: u32,
}

impl SetFileWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            dir_mode: DIR_PERMISSIONS,
            file_mode: FILE_PERMISSIONS,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.output_dir.clone())
    }

    fn by_country_dir(&self) -> PathBuf {
        self.output_dir.join(BY_COUNTRY_DIR)
    }

    /// Write both global files and every per-country file.
    ///
    /// Stops at the first file-system error; files already written stay.
    pub fn write_all(&self, buckets: &CountryBuckets) -> Result<WriteSummary> {
        let by_country = self.by_country_dir();
        self.create_dir(&by_country)
            .with_context(|| format!("Failed to create directory {}", by_country.display()))?;

        let mut summary = WriteSummary::default();

        summary.global_files.push(
            self.write_global(AddressFamily::Ipv4, buckets.ipv4())
                .context("Failed to generate IPv4 global file")?,
        );
        summary.global_files.push(
            self.write_global(AddressFamily::Ipv6, buckets.ipv6())
                .context("Failed to generate IPv6 global file")?,
        );

        for (code, prefixes) in buckets.ipv4() {
            if let Some(path) = self
                .write_country(code, AddressFamily::Ipv4, prefixes)
                .with_context(|| format!("Failed to generate IPv4 file for {}", code))?
            {
                summary.country_files.push(path);
            }
        }

        for (code, prefixes) in buckets.ipv6() {
            if let Some(path) = self
                .write_country(code, AddressFamily::Ipv6, prefixes)
                .with_context(|| format!("Failed to generate IPv6 file for {}", code))?
            {
                summary.country_files.push(path);
            }
        }

        info!(
            "Generated {} per-country files in {}",
            format_count(summary.country_files.len()),
            by_country.display()
        );

        Ok(summary)
    }

    /// Write `geoip_<family>.nft` with every country of that family
    pub fn write_global<T: Display>(
        &self,
        family: AddressFamily,
        countries: &BTreeMap<CountryCode, Vec<T>>,
    ) -> Result<PathBuf> {
        let path = self.output_dir.join(family.global_file_name());
        self.write_file(&path, &render_global(family, countries))?;

        println!("✅ Generated {}", path.display());
        Ok(path)
    }

    /// Write `by_country/<CC>/<CC>_<family>.nft`; nothing is written for an empty list
    pub fn write_country<T: Display>(
        &self,
        code: &CountryCode,
        family: AddressFamily,
        prefixes: &[T],
    ) -> Result<Option<PathBuf>> {
        if prefixes.is_empty() {
            return Ok(None);
        }

        let country_dir = self.by_country_dir().join(code.as_str());
        self.create_dir(&country_dir).with_context(|| {
            format!("Failed to create country directory {}", country_dir.display())
        })?;

        let path = country_dir.join(family.country_file_name(code));
        let script = render_table(std::iter::once(render_set_block(code, family, prefixes)));
        self.write_file(&path, &script)?;

        debug!("Generated {}", path.display());
        Ok(Some(path))
    }

    fn create_dir(&self, path: &Path) -> std::io::Result<()> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.dir_mode);
        }
        builder.create(path)
    }

    /// Create or truncate `path` and write `contents`
    fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(self.file_mode);
        }

        let mut file = options
            .open(path)
            .with_context(|| format!("Failed to create file {}", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write file {}", path.display()))?;
        file.flush()
            .with_context(|| format!("Failed to write file {}", path.display()))?;
        Ok(())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use ipnet::{Ipv4Net, Ipv6Net};
    use proptest::prelude::*;

    /// Parse a set block back with a line-oriented reader
    fn parse_block(block: &str) -> Option<(String, String, Vec<String>)> {
        let mut lines = block.lines();
        let code = lines
            .next()?
            .strip_prefix("    set ")?
            .strip_suffix(" {")?
            .to_string();
        let family = lines.next()?.strip_prefix("        type ")?.to_string();
        if lines.next()? != "        flags interval" {
            return None;
        }
        let elements = lines
            .next()?
            .strip_prefix("        elements = { ")?
            .strip_suffix(" }")?
            .split(", ")
            .map(str::to_string)
            .collect();
        if lines.next()? != "    }" || lines.next().is_some() {
            return None;
        }
        Some((code, family, elements))
    }

    fn ipv4_net_strategy() -> impl Strategy<Value = Ipv4Net> {
        (any::<u32>(), 0u8..=32).prop_map(|(addr, len)| {
            Ipv4Net::new(std::net::Ipv4Addr::from(addr), len)
                .unwrap()
                .trunc()
        })
    }

    fn ipv6_net_strategy() -> impl Strategy<Value = Ipv6Net> {
        (any::<u128>(), 0u8..=128).prop_map(|(addr, len)| {
            Ipv6Net::new(std::net::Ipv6Addr::from(addr), len)
                .unwrap()
                .trunc()
        })
    }

    proptest! {
        /// A rendered block reads back to the same code, type and elements
        #[test]
        fn prop_block_round_trip(
            raw_code in "[A-Z]{2}",
            nets in prop::collection::vec(ipv4_net_strategy(), 1..20),
        ) {
            let code = CountryCode::parse(&raw_code).unwrap();
            let block = render_set_block(&code, AddressFamily::Ipv4, &nets);

            let (parsed_code, parsed_family, parsed_elements) = parse_block(&block).unwrap();
            prop_assert_eq!(parsed_code, raw_code);
            prop_assert_eq!(parsed_family, "ipv4_addr");
            let expected: Vec<String> = nets.iter().map(ToString::to_string).collect();
            prop_assert_eq!(parsed_elements, expected);
        }

        /// IPv6 blocks read back to the same networks, compressed text included
        #[test]
        fn prop_block_round_trip_ipv6(
            raw_code in "[A-Z]{2}",
            nets in prop::collection::vec(ipv6_net_strategy(), 1..20),
        ) {
            let code = CountryCode::parse(&raw_code).unwrap();
            let block = render_set_block(&code, AddressFamily::Ipv6, &nets);

            let (parsed_code, parsed_family, parsed_elements) = parse_block(&block).unwrap();
            prop_assert_eq!(parsed_code, raw_code);
            prop_assert_eq!(parsed_family, "ipv6_addr");
            let parsed_nets: Vec<Ipv6Net> = parsed_elements
                .iter()
                .map(|element| element.parse().unwrap())
                .collect();
            prop_assert_eq!(parsed_nets, nets);
        }

        /// Rendering is deterministic
        #[test]
        fn prop_render_global_deterministic(
            entries in prop::collection::vec(("[A-Z]{2}", ipv4_net_strategy()), 0..30),
        ) {
            let mut countries: BTreeMap<CountryCode, Vec<Ipv4Net>> = BTreeMap::new();
            for (raw, net) in &entries {
                countries.entry(CountryCode::parse(raw).unwrap()).or_default().push(*net);
            }
            prop_assert_eq!(
                render_global(AddressFamily::Ipv4, &countries),
                render_global(AddressFamily::Ipv4, &countries)
            );
        }
    }
}
