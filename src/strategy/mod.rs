//! Mean-reversion signal generation
//!
//! A three-state machine over the rolling z-score: enter long when price
//! stretches far below the rolling mean, short when far above, and exit on
//! the reversion to the mean. Entries use strict threshold comparisons and
//! exits use non-strict zero comparisons, so the sign-crossing point itself
//! closes a trade.

use serde::{Deserialize, Serialize};

use crate::statistics::RollingStatistics;

/// Default entry threshold in rolling standard deviations.
pub const DEFAULT_THRESHOLD: f64 = 2.5;

/// Directional trading signal.
///
/// Modeled as an explicit sum type; code compares against the variants,
/// never against numeric aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Flat,
    Long,
    Short,
}

/// Stateful signal generator parameterized by an entry threshold.
///
/// `generate` performs at most one transition per call; a round trip within
/// a single tick cannot occur, and Long never flips directly to Short.
/// A non-positive threshold is accepted but produces undefined signals.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    threshold: f64,
    state: Signal,
}

impl SignalGenerator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            state: Signal::Flat,
        }
    }

    /// Advance the state machine on the current price and return the new
    /// signal.
    ///
    /// While the estimator is still filling its window this returns `Flat`
    /// without touching the state.
    #[inline]
    pub fn generate(&mut self, price: f64, stats: &RollingStatistics) -> Signal {
        if !stats.is_ready() {
            return Signal::Flat;
        }

        let z = stats.zscore(price);
        self.state = match self.state {
            Signal::Flat => {
                if z < -self.threshold {
                    Signal::Long
                } else if z > self.threshold {
                    Signal::Short
                } else {
                    Signal::Flat
                }
            }
            Signal::Long => {
                if z >= 0.0 {
                    Signal::Flat
                } else {
                    Signal::Long
                }
            }
            Signal::Short => {
                if z <= 0.0 {
                    Signal::Flat
                } else {
                    Signal::Short
                }
            }
        };
        self.state
    }

    /// The state after the most recent `generate` call.
    #[inline]
    pub fn current_signal(&self) -> Signal {
        self.state
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Return to `Flat` for a fresh pass.
    pub fn reset(&mut self) {
        self.state = Signal::Flat;
    }
}
