//! Scan statistics and reports

use std::collections::BTreeMap;

use serde::Serialize;

use crate::brr::BlockHeader;
use crate::Result;

use super::rules::RejectReason;
use super::{HeaderIssues, SampleRecord};

/// Counters gathered over one or more scanned regions.
///
/// Filter, shift and header-issue counts cover every block walked, including
/// chains that were later discarded for lacking an end block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Regions scanned
    pub regions_scanned: usize,
    /// Candidates that passed the rules and started a chain walk
    pub chains_walked: usize,
    /// Chain walks that hit the cap or the buffer end without an end block
    pub chains_discarded: usize,
    /// Samples emitted
    pub samples_found: usize,
    /// Sum of emitted sample lengths in bytes
    pub total_sample_bytes: usize,
    /// Rejected candidate offsets, by reason
    pub validation_failures: BTreeMap<RejectReason, usize>,
    /// Header issues seen in walked blocks, by issue name
    pub header_issues: BTreeMap<&'static str, usize>,
    /// Walked blocks per filter
    pub filter_usage: BTreeMap<u8, usize>,
    /// Walked blocks per shift
    pub shift_usage: BTreeMap<u8, usize>,
    /// Emitted samples per loop pattern
    pub loop_patterns: BTreeMap<&'static str, usize>,
}

impl ScanStats {
    /// Empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_rejection(&mut self, reason: RejectReason) {
        self.record_rejections(reason, 1);
    }

    pub(crate) fn record_rejections(&mut self, reason: RejectReason, count: usize) {
        *self.validation_failures.entry(reason).or_default() += count;
    }

    pub(crate) fn record_block(&mut self, header: BlockHeader, issues: HeaderIssues) {
        *self.filter_usage.entry(header.filter_bits()).or_default() += 1;
        *self.shift_usage.entry(header.shift()).or_default() += 1;
        for name in issues.names() {
            *self.header_issues.entry(name).or_default() += 1;
        }
    }

    pub(crate) fn record_sample(&mut self, record: &SampleRecord) {
        self.samples_found += 1;
        self.total_sample_bytes += record.length;
        *self.loop_patterns.entry(record.loop_pattern()).or_default() += 1;
    }

    /// Rejections recorded for `reason`
    pub fn rejections(&self, reason: RejectReason) -> usize {
        self.validation_failures.get(&reason).copied().unwrap_or(0)
    }

    /// Mean emitted sample length in bytes
    pub fn average_sample_size(&self) -> f64 {
        if self.samples_found == 0 {
            0.0
        } else {
            self.total_sample_bytes as f64 / self.samples_found as f64
        }
    }

    /// Fold another set of counters into this one
    pub fn merge(&mut self, other: &ScanStats) {
        self.regions_scanned += other.regions_scanned;
        self.chains_walked += other.chains_walked;
        self.chains_discarded += other.chains_discarded;
        self.samples_found += other.samples_found;
        self.total_sample_bytes += other.total_sample_bytes;
        for (&k, &v) in &other.validation_failures {
            *self.validation_failures.entry(k).or_default() += v;
        }
        for (&k, &v) in &other.header_issues {
            *self.header_issues.entry(k).or_default() += v;
        }
        for (&k, &v) in &other.filter_usage {
            *self.filter_usage.entry(k).or_default() += v;
        }
        for (&k, &v) in &other.shift_usage {
            *self.shift_usage.entry(k).or_default() += v;
        }
        for (&k, &v) in &other.loop_patterns {
            *self.loop_patterns.entry(k).or_default() += v;
        }
    }

    /// Tuning hints derived from the counters
    pub fn recommendations(&self) -> Vec<String> {
        let mut hints = Vec::new();

        if self.rejections(RejectReason::InvalidShift) > 0 {
            hints.push(
                "Consider allowing shift values up to 15 as some games may use the extended range"
                    .to_string(),
            );
        }
        if self.rejections(RejectReason::AsciiTextPattern) > 0 {
            hints.push(
                "ASCII text detection is rejecting false positives; keep it enabled".to_string(),
            );
        }
        if self.rejections(RejectReason::AllFfPattern) > 0 {
            hints.push("All-0xFF blocks were rejected; these are likely uninitialized data".to_string());
        }
        if self.header_issues.contains_key(HeaderIssues::RESERVED_BITS_NAME) {
            hints.push(
                "Some samples have reserved bits set; consider treating this as a warning".to_string(),
            );
        }
        if self.header_issues.contains_key(HeaderIssues::LOOP_AND_END_NAME) {
            hints.push(
                "Some samples have both loop and end flags set; check that this is intentional"
                    .to_string(),
            );
        }
        if !self.filter_usage.is_empty() {
            let unused: Vec<String> = (0u8..4)
                .filter(|f| !self.filter_usage.contains_key(f))
                .map(|f| f.to_string())
                .collect();
            if !unused.is_empty() {
                hints.push(format!(
                    "Filter types {} were not found; validation may be too strict",
                    unused.join(", ")
                ));
            }
        }
        hints
    }
}

/// Records and statistics from a scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    /// Emitted samples in scan order
    pub records: Vec<SampleRecord>,
    /// Aggregated counters
    pub stats: ScanStats,
    /// Hints from [`ScanStats::recommendations`]
    pub recommendations: Vec<String>,
}

impl ScanReport {
    /// Build a report, deriving its recommendations from `stats`
    pub fn new(records: Vec<SampleRecord>, stats: ScanStats) -> Self {
        let recommendations = stats.recommendations();
        ScanReport {
            records,
            stats,
            recommendations,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_counters() {
        let mut stats = ScanStats::new();
        let header = BlockHeader::from_byte(0xDB);
        stats.record_block(header, HeaderIssues::from_header(header));
        assert_eq!(stats.filter_usage.get(&2), Some(&1));
        assert_eq!(stats.shift_usage.get(&13), Some(&1));
        assert_eq!(stats.header_issues.get("invalid_shift"), Some(&1));
        assert_eq!(stats.header_issues.get("reserved_bits_set"), Some(&1));
        assert_eq!(stats.header_issues.get("loop_and_end_both_set"), Some(&1));
    }

    #[test]
    fn test_merge_adds_counts() {
        let mut a = ScanStats::new();
        a.record_rejection(RejectReason::AllFfPattern);
        let mut b = ScanStats::new();
        b.record_rejection(RejectReason::AllFfPattern);
        b.record_rejection(RejectReason::InvalidShift);
        b.regions_scanned = 2;
        a.merge(&b);
        assert_eq!(a.rejections(RejectReason::AllFfPattern), 2);
        assert_eq!(a.rejections(RejectReason::InvalidShift), 1);
        assert_eq!(a.regions_scanned, 2);
    }

    #[test]
    fn test_recommendations() {
        let mut stats = ScanStats::new();
        assert!(stats.recommendations().is_empty());

        stats.record_rejection(RejectReason::InvalidShift);
        let header = BlockHeader::from_byte(0x00);
        stats.record_block(header, HeaderIssues::empty());
        let hints = stats.recommendations();
        assert_eq!(hints.len(), 2);
        assert!(hints[0].contains("shift values up to 15"));
        assert!(hints[1].contains("1, 2, 3"));
    }

    #[test]
    fn test_report_json_keys() {
        let mut stats = ScanStats::new();
        stats.record_rejection(RejectReason::AsciiTextPattern);
        let report = ScanReport::new(Vec::new(), stats);
        let json: serde_json::Value = serde_json::from_str(&report.to_json(false).unwrap()).unwrap();
        assert_eq!(json["stats"]["validation_failures"]["ascii_text_pattern"], 1);
        assert_eq!(json["records"].as_array().map(Vec::len), Some(0));
        assert_eq!(json["recommendations"].as_array().map(Vec::len), Some(1));
    }
}
