//! Performance metrics aggregation
//!
//! End-of-run pass over the terminal state, equity curve and trade log.
//! Annualized volatility treats equity samples as one-second-spaced, which
//! overstates the sample rate because samples occur only at transitions;
//! the formula is kept as-is so results stay comparable across runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::engine::Backtester;

/// Annualization factor for one-second-spaced samples: 252 trading days of
/// 86,400 seconds.
const SECONDS_PER_YEAR: f64 = 252.0 * 86_400.0;

/// Volatility below this is treated as zero for the Sharpe ratio.
const MIN_VOLATILITY: f64 = 1e-10;

/// Aggregate performance of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Fractional return on starting capital
    pub total_return: f64,

    /// Annualized volatility of equity-sample returns
    pub volatility: f64,

    /// Annualized risk-adjusted return, zero risk-free rate
    pub sharpe_ratio: f64,

    /// Largest fractional decline from a running equity peak
    pub max_drawdown: f64,

    /// Fraction of closed trades with positive pnl
    pub win_rate: f64,

    /// Mean holding period in seconds
    pub avg_trade_length_secs: f64,

    pub ticks_processed: u64,

    /// Stream rate over the data's own clock
    pub ticks_per_second: f64,

    pub total_trades: usize,
    pub winning_trades: usize,

    /// Wall-clock run duration in seconds
    pub processing_time_secs: f64,

    /// Wall-clock nanoseconds spent per tick
    pub avg_latency_ns: f64,
}

impl PerformanceMetrics {
    /// Aggregate a finished run.
    pub fn compute(bt: &Backtester, elapsed: Duration) -> Self {
        let initial_capital = bt.config().initial_capital;
        let total_return = (bt.equity() - initial_capital) / initial_capital;

        // Per-sample returns over adjacent equity points.
        let returns: Vec<f64> = bt
            .equity_curve()
            .windows(2)
            .filter(|w| w[0].equity > 0.0)
            .map(|w| (w[1].equity - w[0].equity) / w[0].equity)
            .collect();

        let volatility = if returns.is_empty() {
            0.0
        } else {
            let mean_r = returns.iter().sum::<f64>() / returns.len() as f64;
            let var_r = returns.iter().map(|r| (r - mean_r).powi(2)).sum::<f64>()
                / returns.len() as f64;
            var_r.sqrt() * SECONDS_PER_YEAR.sqrt()
        };

        let sharpe_ratio = if volatility > MIN_VOLATILITY {
            total_return / volatility * 252f64.sqrt()
        } else {
            0.0
        };

        let total_trades = bt.trades().len();
        let winning_trades = bt.trades().iter().filter(|t| t.pnl > 0.0).count();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        let avg_trade_length_secs = if total_trades > 0 {
            let total_us: i64 = bt.trades().iter().map(|t| t.duration_us).sum();
            (total_us as f64 / total_trades as f64) / 1e6
        } else {
            0.0
        };

        let ticks_per_second = match bt.first_timestamp() {
            Some(first) => {
                let span_secs = (bt.last_timestamp() - first) as f64 / 1e6;
                if span_secs > 0.0 {
                    bt.ticks_processed() as f64 / span_secs
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        let processing_time_secs = elapsed.as_secs_f64();
        let avg_latency_ns = if bt.ticks_processed() > 0 {
            elapsed.as_nanos() as f64 / bt.ticks_processed() as f64
        } else {
            0.0
        };

        Self {
            total_return,
            volatility,
            sharpe_ratio,
            max_drawdown: bt.max_drawdown(),
            win_rate,
            avg_trade_length_secs,
            ticks_processed: bt.ticks_processed(),
            ticks_per_second,
            total_trades,
            winning_trades,
            processing_time_secs,
            avg_latency_ns,
        }
    }

    /// Human-readable results block for standard output.
    pub fn summary(&self) -> String {
        format!(
            r#"
Backtest Results
================
Total Return: {:.2}%
Volatility: {:.4}
Sharpe Ratio: {:.2}
Max Drawdown: {:.2}%
Win Rate: {:.2}%
Avg Trade Length: {:.1}s
Ticks Processed: {}
Ticks/Second: {:.0}
Total Trades: {}
Winning Trades: {}
Processing Time: {:.3}s
Avg Latency: {:.0} ns
"#,
            self.total_return * 100.0,
            self.volatility,
            self.sharpe_ratio,
            self.max_drawdown * 100.0,
            self.win_rate * 100.0,
            self.avg_trade_length_secs,
            self.ticks_processed,
            self.ticks_per_second,
            self.total_trades,
            self.winning_trades,
            self.processing_time_secs,
            self.avg_latency_ns,
        )
    }
}
