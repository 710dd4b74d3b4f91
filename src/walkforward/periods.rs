//! Walk-forward split generation.
//!
//! Produces the positions at which the model is refit. The remainder of
//! `(len - warmup) / oos_periods` is folded into the warmup so every
//! out-of-sample block has the same length and the final block ends exactly
//! at the end of the data.

use serde::{Deserialize, Serialize};

use super::tester::WalkForwardError;

/// Configuration for walk-forward splits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Length of each out-of-sample block.
    pub oos_periods: usize,
    /// Minimum number of observations before the first fit.
    pub warmup: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            oos_periods: 21,
            warmup: 252,
        }
    }
}

/// Split schedule for a dataset of a given length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPlan {
    len: usize,
    warmup: usize,
    oos_periods: usize,
}

impl SplitPlan {
    /// Create a plan. `warmup >= len` is valid and yields no splits.
    pub fn new(len: usize, warmup: usize, oos_periods: usize) -> Result<Self, WalkForwardError> {
        if oos_periods == 0 {
            return Err(WalkForwardError::InvalidConfig(
                "oos_periods must be positive".to_string(),
            ));
        }
        if warmup == 0 {
            return Err(WalkForwardError::InvalidConfig(
                "warmup must be positive".to_string(),
            ));
        }

        Ok(Self {
            len,
            warmup,
            oos_periods,
        })
    }

    pub fn from_config(len: usize, config: &WalkForwardConfig) -> Result<Self, WalkForwardError> {
        Self::new(len, config.warmup, config.oos_periods)
    }

    pub fn data_len(&self) -> usize {
        self.len
    }

    pub fn warmup(&self) -> usize {
        self.warmup
    }

    pub fn oos_periods(&self) -> usize {
        self.oos_periods
    }

    /// Number of fit/forecast cycles.
    pub fn iterations(&self) -> usize {
        self.len.saturating_sub(self.warmup) / self.oos_periods
    }

    /// Warmup with the uneven remainder absorbed.
    pub fn adjusted_warmup(&self) -> usize {
        self.warmup + self.len.saturating_sub(self.warmup) % self.oos_periods
    }

    /// Split positions in increasing order. Each call starts a fresh sequence.
    pub fn indices(&self) -> SplitIndices {
        SplitIndices {
            start: self.adjusted_warmup(),
            step: self.oos_periods,
            next: 0,
            iterations: self.iterations(),
        }
    }
}

impl IntoIterator for &SplitPlan {
    type Item = usize;
    type IntoIter = SplitIndices;

    fn into_iter(self) -> Self::IntoIter {
        self.indices()
    }
}

/// Lazy iterator over split positions.
#[derive(Debug, Clone)]
pub struct SplitIndices {
    start: usize,
    step: usize,
    next: usize,
    iterations: usize,
}

impl Iterator for SplitIndices {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.iterations {
            return None;
        }
        let index = self.start + self.step * self.next;
        self.next += 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.iterations - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SplitIndices {}
