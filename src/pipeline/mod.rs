//! Reader/compute pipeline
//!
//! The reference deployment calls the per-tick pipeline inline; this module
//! provides the optional split where a reader thread feeds a bounded
//! lock-free ring and a compute thread (optionally pinned to a core) drains
//! it. Ordering is FIFO per producer, which is all the order-sensitive
//! estimator downstream requires.

pub mod ring;
pub mod runner;

pub use ring::TickRing;
pub use runner::{pin_to_core, run_piped, DEFAULT_RING_CAPACITY};
