//! Reversion Lab - High-performance tick-by-tick backtesting engine for ES
//! futures mean-reversion strategies
//!
//! This library provides:
//! - Zero-copy tick ingestion over memory-mapped CSV files
//! - Online rolling statistics (Welford fill + exponentially-weighted steady state)
//! - Three-state mean-reversion signal generation
//! - Execution simulation with slippage and per-side commission
//! - Performance metrics and CSV reporting
//! - Optional lock-free reader/compute pipeline for threaded runs

pub mod backtesting;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod statistics;
pub mod strategy;

// Re-export commonly used types
pub use backtesting::{BacktestConfig, Backtester, PerformanceMetrics, Trade};
pub use data::{Tick, TickReader};
pub use error::EngineError;
pub use pipeline::TickRing;
pub use statistics::RollingStatistics;
pub use strategy::{Signal, SignalGenerator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
