//! Candidate block heuristics.
//!
//! Each rule looks at one header byte and its 8 data bytes and either
//! decides the candidate or passes. Rules run in order and the first
//! decision wins; a candidate no rule decides is accepted.

use std::fmt;

use serde::Serialize;

use crate::brr::BlockHeader;
use crate::constants::BLOCK_DATA_SIZE;

/// Why a candidate block was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptReason {
    /// All data bytes zero (silence or padding)
    SilenceBlock,
    /// Passed every rejection rule
    Valid,
}

/// Why a candidate offset was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Shift above 12
    InvalidShift,
    /// All data bytes 0xFF (erased or uninitialized memory)
    AllFfPattern,
    /// All data bytes identical with shift 0
    MonotonePattern,
    /// All data bytes printable ASCII
    AsciiTextPattern,
    /// Fewer than 9 bytes left in the buffer
    InsufficientData,
}

impl RejectReason {
    /// Stable identifier used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::InvalidShift => "invalid_shift",
            RejectReason::AllFfPattern => "all_ff_pattern",
            RejectReason::MonotonePattern => "monotone_pattern",
            RejectReason::AsciiTextPattern => "ascii_text_pattern",
            RejectReason::InsufficientData => "insufficient_data",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a rule that decided a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Start a chain walk here
    Accept(AcceptReason),
    /// Skip this offset
    Reject(RejectReason),
}

impl Verdict {
    /// Whether the verdict accepts the candidate
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept(_))
    }
}

/// A heuristic applied to a candidate block
pub trait BlockRule: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    /// Decide the candidate, or return `None` to defer to later rules
    fn evaluate(&self, header: BlockHeader, data: &[u8; BLOCK_DATA_SIZE]) -> Option<Verdict>;
}

/// Rejects shifts outside the normal 0-12 range
#[derive(Debug, Clone, Copy, Default)]
pub struct ShiftRangeRule;

impl BlockRule for ShiftRangeRule {
    fn name(&self) -> &'static str {
        "shift_range"
    }

    fn evaluate(&self, header: BlockHeader, _data: &[u8; BLOCK_DATA_SIZE]) -> Option<Verdict> {
        (!header.has_normal_shift()).then_some(Verdict::Reject(RejectReason::InvalidShift))
    }
}

/// Accepts all-zero data outright
#[derive(Debug, Clone, Copy, Default)]
pub struct SilenceRule;

impl BlockRule for SilenceRule {
    fn name(&self) -> &'static str {
        "silence"
    }

    fn evaluate(&self, _header: BlockHeader, data: &[u8; BLOCK_DATA_SIZE]) -> Option<Verdict> {
        data.iter()
            .all(|&b| b == 0)
            .then_some(Verdict::Accept(AcceptReason::SilenceBlock))
    }
}

/// Rejects all-0xFF data
#[derive(Debug, Clone, Copy, Default)]
pub struct ErasedFillRule;

impl BlockRule for ErasedFillRule {
    fn name(&self) -> &'static str {
        "erased_fill"
    }

    fn evaluate(&self, _header: BlockHeader, data: &[u8; BLOCK_DATA_SIZE]) -> Option<Verdict> {
        data.iter()
            .all(|&b| b == 0xFF)
            .then_some(Verdict::Reject(RejectReason::AllFfPattern))
    }
}

/// Rejects a single repeated byte when the shift is 0
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotoneRule;

impl BlockRule for MonotoneRule {
    fn name(&self) -> &'static str {
        "monotone"
    }

    fn evaluate(&self, header: BlockHeader, data: &[u8; BLOCK_DATA_SIZE]) -> Option<Verdict> {
        let uniform = data.iter().all(|&b| b == data[0]);
        (uniform && header.shift() == 0).then_some(Verdict::Reject(RejectReason::MonotonePattern))
    }
}

/// Rejects data made entirely of printable ASCII
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiTextRule;

impl BlockRule for AsciiTextRule {
    fn name(&self) -> &'static str {
        "ascii_text"
    }

    fn evaluate(&self, _header: BlockHeader, data: &[u8; BLOCK_DATA_SIZE]) -> Option<Verdict> {
        data.iter()
            .all(|b| (0x20..=0x7E).contains(b))
            .then_some(Verdict::Reject(RejectReason::AsciiTextPattern))
    }
}

/// The standard rule list, in evaluation order
pub fn default_rules() -> Vec<Box<dyn BlockRule>> {
    vec![
        Box::new(ShiftRangeRule),
        Box::new(SilenceRule),
        Box::new(ErasedFillRule),
        Box::new(MonotoneRule),
        Box::new(AsciiTextRule),
    ]
}

/// Run `rules` in order; the first decision wins, otherwise accept.
pub fn evaluate_rules(
    rules: &[Box<dyn BlockRule>],
    header: BlockHeader,
    data: &[u8; BLOCK_DATA_SIZE],
) -> Verdict {
    rules
        .iter()
        .find_map(|rule| rule.evaluate(header, data))
        .unwrap_or(Verdict::Accept(AcceptReason::Valid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(header: u8, data: [u8; 8]) -> Verdict {
        evaluate_rules(&default_rules(), BlockHeader::from_byte(header), &data)
    }

    #[test]
    fn test_shift_checked_first() {
        assert_eq!(
            verdict(0xD0, [0; 8]),
            Verdict::Reject(RejectReason::InvalidShift)
        );
        assert_eq!(
            verdict(0xC0, [0; 8]),
            Verdict::Accept(AcceptReason::SilenceBlock)
        );
    }

    #[test]
    fn test_fill_patterns() {
        assert_eq!(
            verdict(0x10, [0xFF; 8]),
            Verdict::Reject(RejectReason::AllFfPattern)
        );
        assert_eq!(
            verdict(0x00, [0x88; 8]),
            Verdict::Reject(RejectReason::MonotonePattern)
        );
        // uniform data is fine once the shift is non-zero
        assert_eq!(verdict(0x10, [0x88; 8]), Verdict::Accept(AcceptReason::Valid));
    }

    #[test]
    fn test_ascii_text_rejected() {
        assert_eq!(
            verdict(0x10, *b"Hello!!~"),
            Verdict::Reject(RejectReason::AsciiTextPattern)
        );
        assert_eq!(
            verdict(0x10, [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0]),
            Verdict::Accept(AcceptReason::Valid)
        );
    }

    #[test]
    fn test_custom_rule_appended() {
        struct RejectFilterThree;
        impl BlockRule for RejectFilterThree {
            fn name(&self) -> &'static str {
                "no_filter_3"
            }
            fn evaluate(&self, header: BlockHeader, _data: &[u8; 8]) -> Option<Verdict> {
                (header.filter_bits() == 3).then_some(Verdict::Reject(RejectReason::InvalidShift))
            }
        }
        let mut rules = default_rules();
        rules.push(Box::new(RejectFilterThree));
        assert_eq!(rules.last().map(|r| r.name()), Some("no_filter_3"));
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];
        assert!(!evaluate_rules(&rules, BlockHeader::from_byte(0x1C), &data).is_accept());
        assert!(evaluate_rules(&rules, BlockHeader::from_byte(0x18), &data).is_accept());
    }

    #[test]
    fn test_reason_names() {
        assert_eq!(RejectReason::AllFfPattern.to_string(), "all_ff_pattern");
        assert_eq!(
            serde_json::to_string(&RejectReason::InsufficientData).unwrap(),
            "\"insufficient_data\""
        );
    }
}
