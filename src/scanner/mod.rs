//! ROM Sample Scanner
//!
//! Heuristically locates BRR samples in unlabeled binary data such as
//! cartridge dumps. Each region is scanned left to right:
//!
//! 1. The candidate block at the cursor is checked against an ordered rule
//!    list ([`rules`]); a rejected offset advances the cursor by one byte.
//! 2. An accepted candidate starts a chain walk over consecutive blocks
//!    until an end-flagged block, the block cap, or the end of the buffer.
//! 3. A chain that ends with an end flag becomes a [`SampleRecord`] and the
//!    cursor jumps past it; any other chain is dropped and the cursor
//!    advances by one byte.
//!
//! A candidate offset with fewer than 9 bytes left in the buffer advances
//! the cursor by a whole block instead.

pub mod rules;
pub mod stats;

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::Serialize;
use tracing::debug;

use crate::brr::{BlockHeader, BlockReader};
use crate::constants::BLOCK_SIZE;
use crate::{BrrError, Result};

pub use rules::{default_rules, evaluate_rules, AcceptReason, BlockRule, RejectReason, Verdict};
pub use stats::{ScanReport, ScanStats};

/// Default chain length cap
pub const DEFAULT_MAX_BLOCKS: usize = 500;

/// Regions where SNES cartridges commonly keep sample data
pub const ROM_SEARCH_REGIONS: [(usize, usize); 3] = [
    (0x8000, 0x20000),
    (0x40000, 0x80000),
    (0x200000, 0x400000),
];

bitflags! {
    /// Suspicious header properties, counted but never fatal
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HeaderIssues: u8 {
        /// Shift above 12
        const INVALID_SHIFT = 0x01;
        /// Either of the top two header bits set
        const RESERVED_BITS_SET = 0x02;
        /// Loop and end flags on the same block
        const LOOP_AND_END_BOTH_SET = 0x04;
    }
}

impl HeaderIssues {
    pub(crate) const INVALID_SHIFT_NAME: &'static str = "invalid_shift";
    pub(crate) const RESERVED_BITS_NAME: &'static str = "reserved_bits_set";
    pub(crate) const LOOP_AND_END_NAME: &'static str = "loop_and_end_both_set";

    /// Inspect a header byte
    pub fn from_header(header: BlockHeader) -> Self {
        let mut issues = HeaderIssues::empty();
        issues.set(HeaderIssues::INVALID_SHIFT, !header.has_normal_shift());
        issues.set(HeaderIssues::RESERVED_BITS_SET, (header.raw() >> 6) & 0x03 != 0);
        issues.set(
            HeaderIssues::LOOP_AND_END_BOTH_SET,
            header.is_loop() && header.is_end(),
        );
        issues
    }

    /// Report names of the set issues
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        let issues = *self;
        [
            (HeaderIssues::INVALID_SHIFT, Self::INVALID_SHIFT_NAME),
            (HeaderIssues::RESERVED_BITS_SET, Self::RESERVED_BITS_NAME),
            (HeaderIssues::LOOP_AND_END_BOTH_SET, Self::LOOP_AND_END_NAME),
        ]
        .into_iter()
        .filter(move |(flag, _)| issues.contains(*flag))
        .map(|(_, name)| name)
    }
}

/// Half-open byte range `[start, end)` to scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScanRegion {
    /// First candidate offset
    pub start: usize,
    /// Candidates must fit a whole block below this offset
    pub end: usize,
}

impl ScanRegion {
    /// Create a region
    pub fn new(start: usize, end: usize) -> Self {
        ScanRegion { start, end }
    }

    /// The whole of a `len`-byte buffer
    pub fn whole(len: usize) -> Self {
        ScanRegion { start: 0, end: len }
    }

    /// Region length in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the region covers no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for ScanRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}..0x{:06X}", self.start, self.end)
    }
}

impl FromStr for ScanRegion {
    type Err = BrrError;

    /// Parse `START:END`, each bound hex (`0x8000`) or decimal
    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| BrrError::ConfigError(format!("region '{s}' must be START:END")))?;
        let region = ScanRegion::new(parse_offset(start)?, parse_offset(end)?);
        if region.start >= region.end {
            return Err(BrrError::ConfigError(format!(
                "region '{s}' is empty; START must be below END"
            )));
        }
        Ok(region)
    }
}

fn parse_offset(text: &str) -> Result<usize> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => text.parse::<usize>(),
    };
    parsed.map_err(|e| BrrError::ConfigError(format!("invalid offset '{text}': {e}")))
}

/// Standard SNES search windows clamped to a `len`-byte buffer.
///
/// Windows that start past the end of the buffer are dropped.
pub fn default_rom_regions(len: usize) -> Vec<ScanRegion> {
    ROM_SEARCH_REGIONS
        .iter()
        .map(|&(start, end)| ScanRegion::new(start, end.min(len)))
        .filter(|region| !region.is_empty())
        .collect()
}

/// A sample located by the scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRecord {
    /// Byte offset of the first block
    pub offset: usize,
    /// Length in bytes (always a multiple of 9)
    pub length: usize,
    /// Number of blocks
    pub block_count: usize,
    /// Any block carries the loop flag
    pub has_loop: bool,
    /// The final block carries the end flag
    pub has_end: bool,
    /// Index of the first loop-flagged block
    pub loop_start_block: Option<usize>,
    /// Distinct filters used, ascending
    pub filters_used: Vec<u8>,
    /// Smallest and largest shift seen
    pub shift_range: (u8, u8),
    /// Total header issues over all blocks
    pub header_issue_count: usize,
}

impl SampleRecord {
    /// Offset one past the last byte
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Byte offset of the loop block, relative to the sample start
    pub fn loop_start_offset(&self) -> Option<usize> {
        self.loop_start_block.map(|index| index * BLOCK_SIZE)
    }

    /// The sample's bytes within the scanned buffer
    pub fn bytes<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]> {
        data.get(self.offset..self.end())
    }

    /// Loop classification used in scan statistics
    pub fn loop_pattern(&self) -> &'static str {
        match (self.has_loop, self.has_end) {
            (true, true) => "loop_and_end",
            (true, false) => "loop_only",
            (false, true) => "end_only",
            (false, false) => "none",
        }
    }
}

/// Heuristic BRR sample finder.
///
/// Holds only its rule list and block cap, so one scanner can be shared
/// across threads and reused for any number of buffers.
pub struct RomSampleScanner {
    rules: Vec<Box<dyn BlockRule>>,
    max_blocks: usize,
}

impl RomSampleScanner {
    /// Scanner with the default rules and a 500-block cap
    pub fn new() -> Self {
        RomSampleScanner {
            rules: default_rules(),
            max_blocks: DEFAULT_MAX_BLOCKS,
        }
    }

    /// Set the chain length cap
    pub fn with_max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = max_blocks;
        self
    }

    /// Append a rule after the existing ones
    pub fn with_rule(mut self, rule: Box<dyn BlockRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Chain length cap
    pub fn max_blocks(&self) -> usize {
        self.max_blocks
    }

    /// Rule names in evaluation order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Scan one region of `data`
    pub fn scan(&self, data: &[u8], region: ScanRegion) -> Vec<SampleRecord> {
        let mut stats = ScanStats::new();
        self.scan_region(data, region, &mut stats)
    }

    /// Scan several regions, collecting statistics
    pub fn scan_with_stats(&self, data: &[u8], regions: &[ScanRegion]) -> ScanReport {
        let mut stats = ScanStats::new();
        let mut records = Vec::new();
        for &region in regions {
            let mut region_stats = ScanStats::new();
            records.extend(self.scan_region(data, region, &mut region_stats));
            stats.merge(&region_stats);
        }
        ScanReport::new(records, stats)
    }

    /// Scan the standard SNES search windows of a ROM image
    pub fn scan_rom(&self, rom: &[u8]) -> ScanReport {
        self.scan_with_stats(rom, &default_rom_regions(rom.len()))
    }

    fn scan_region(
        &self,
        data: &[u8],
        region: ScanRegion,
        stats: &mut ScanStats,
    ) -> Vec<SampleRecord> {
        let reader = BlockReader::new(data);
        let mut records = Vec::new();
        let mut offset = region.start;
        stats.regions_scanned += 1;

        while offset
            .checked_add(BLOCK_SIZE)
            .is_some_and(|block_end| block_end <= region.end)
        {
            let Some(block) = reader.block_at(offset) else {
                // every later candidate in the region is past the buffer too
                let remaining = (region.end - offset - BLOCK_SIZE) / BLOCK_SIZE + 1;
                stats.record_rejections(RejectReason::InsufficientData, remaining);
                break;
            };

            match evaluate_rules(&self.rules, block.header, &block.data) {
                Verdict::Reject(reason) => {
                    stats.record_rejection(reason);
                    offset += 1;
                }
                Verdict::Accept(_) => {
                    stats.chains_walked += 1;
                    match self.walk_chain(&reader, offset, stats) {
                        Some(record) => {
                            debug!(
                                offset = record.offset,
                                blocks = record.block_count,
                                has_loop = record.has_loop,
                                "found BRR sample"
                            );
                            offset = record.end();
                            stats.record_sample(&record);
                            records.push(record);
                        }
                        None => {
                            stats.chains_discarded += 1;
                            offset += 1;
                        }
                    }
                }
            }
        }

        debug!(%region, samples = records.len(), "scanned region");
        records
    }

    fn walk_chain(
        &self,
        reader: &BlockReader<'_>,
        start: usize,
        stats: &mut ScanStats,
    ) -> Option<SampleRecord> {
        let mut offset = start;
        let mut block_count = 0;
        let mut has_end = false;
        let mut loop_start_block = None;
        let mut filters = [false; 4];
        let mut shift_min = u8::MAX;
        let mut shift_max = 0;
        let mut header_issue_count = 0;

        while block_count < self.max_blocks {
            let Some(header) = reader.block_at(offset).map(|block| block.header) else {
                break;
            };
            let issues = HeaderIssues::from_header(header);
            stats.record_block(header, issues);
            header_issue_count += issues.bits().count_ones() as usize;

            filters[header.filter_bits() as usize] = true;
            shift_min = shift_min.min(header.shift());
            shift_max = shift_max.max(header.shift());
            if header.is_loop() && loop_start_block.is_none() {
                loop_start_block = Some(block_count);
            }

            block_count += 1;
            offset += BLOCK_SIZE;
            if header.is_end() {
                has_end = true;
                break;
            }
        }

        if block_count == 0 || !has_end {
            return None;
        }

        Some(SampleRecord {
            offset: start,
            length: offset - start,
            block_count,
            has_loop: loop_start_block.is_some(),
            has_end,
            loop_start_block,
            filters_used: (0u8..4).filter(|&f| filters[f as usize]).collect(),
            shift_range: (shift_min, shift_max),
            header_issue_count,
        })
    }
}

impl Default for RomSampleScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RomSampleScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RomSampleScanner")
            .field("rules", &self.rule_names())
            .field("max_blocks", &self.max_blocks)
            .finish()
    }
}
