//! Predictive Filter
//!
//! Each block selects one of four fixed recurrences that predict the next
//! sample from the previous two decoded samples. Coefficients are exact
//! dyadic fractions; each product is truncated toward zero on its own before
//! the terms are summed.

/// Prediction filter selected by header bits 3-2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Filter {
    /// No prediction
    #[default]
    Zero,
    /// 15/16 * prev1
    One,
    /// 61/32 * prev1 - 15/16 * prev2
    Two,
    /// 115/64 * prev1 - 13/16 * prev2
    Three,
}

impl Filter {
    /// Map the 2-bit header field to a filter (upper bits are ignored)
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Filter::Zero,
            1 => Filter::One,
            2 => Filter::Two,
            _ => Filter::Three,
        }
    }

    /// Header field value of this filter
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Term added to the shifted unit, given the current history
    #[inline]
    pub fn predict(self, state: &FilterState) -> i32 {
        let p1 = state.prev1 as i32;
        let p2 = state.prev2 as i32;
        match self {
            Filter::Zero => 0,
            Filter::One => p1 * 15 / 16,
            Filter::Two => p1 * 61 / 32 + (-p2 * 15) / 16,
            Filter::Three => p1 * 115 / 64 + (-p2 * 13) / 16,
        }
    }
}

/// Two-sample decode history owned by one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterState {
    /// Most recent decoded sample
    pub prev1: i16,
    /// Sample before `prev1`
    pub prev2: i16,
}

impl FilterState {
    /// Fresh history (both samples zero)
    pub fn new() -> Self {
        Self::default()
    }

    /// History seeded with explicit values
    pub fn with_history(prev1: i16, prev2: i16) -> Self {
        FilterState { prev1, prev2 }
    }

    /// Shift a newly decoded sample into the history
    #[inline]
    pub fn push(&mut self, sample: i16) {
        self.prev2 = self.prev1;
        self.prev1 = sample;
    }

    /// Clear the history
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
