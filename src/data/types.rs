//! Quote record types

use serde::{Deserialize, Serialize};

/// A single observed quote record.
///
/// Timestamps are microseconds since epoch and non-decreasing across a valid
/// stream. `ask >= bid` is expected from well-formed data but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Exchange timestamp in microseconds since epoch
    pub timestamp: i64,

    /// Best bid price
    pub bid: f64,

    /// Best ask price
    pub ask: f64,

    /// Quoted volume
    pub volume: i64,
}

impl Tick {
    pub fn new(timestamp: i64, bid: f64, ask: f64, volume: i64) -> Self {
        Self {
            timestamp,
            bid,
            ask,
            volume,
        }
    }

    /// Mid-price of the quote
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}
