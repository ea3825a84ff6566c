//! Backtesting and execution simulation
//!
//! Drives the tick pipeline end-to-end: rolling statistics feed the signal
//! generator, transitions are executed with slippage and per-side
//! commission, and the resulting trade log and equity curve are aggregated
//! into performance metrics and CSV reports.

pub mod engine;
pub mod metrics;
pub mod report;

pub use engine::{Backtester, BacktestConfig, Direction, EquityPoint, Trade};
pub use metrics::PerformanceMetrics;
