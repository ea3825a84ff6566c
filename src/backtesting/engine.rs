//! Core backtesting engine implementation

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{Tick, TickReader};
use crate::error::Result;
use crate::statistics::{RollingStatistics, DEFAULT_WINDOW};
use crate::strategy::{Signal, SignalGenerator, DEFAULT_THRESHOLD};

use super::metrics::PerformanceMetrics;
use super::report;

/// Configuration for backtesting
///
/// Defaults are ES-futures conventions: $2.10 commission per side, one tick
/// (0.25 price units) of adverse slippage per fill leg, $50 per point per
/// contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Starting capital
    pub initial_capital: f64,

    /// Commission charged per fill leg
    pub commission: f64,

    /// Adverse price offset applied at each fill leg
    pub slippage: f64,

    /// Dollar value per unit price move per contract
    pub multiplier: f64,

    /// Rolling statistics window in ticks
    pub window: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            commission: 2.10,
            slippage: 0.25,
            multiplier: 50.0,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Side of a completed round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

/// A closed round-trip trade, immutable once appended to the log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_time: i64,
    pub exit_time: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub direction: Direction,
    /// Net of the exit-leg commission; the entry leg was charged at open.
    pub pnl: f64,
    pub duration_us: i64,
}

/// One equity sample, appended on every position transition.
///
/// The sequence forms a step function sampled at transition events, not at
/// every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: f64,
}

/// Tick-by-tick mean-reversion backtester.
///
/// Owns the trade log and equity curve exclusively; the per-tick path is
/// allocation-free apart from log appends.
pub struct Backtester {
    config: BacktestConfig,
    stats: RollingStatistics,
    signals: SignalGenerator,

    equity: f64,
    peak_equity: f64,
    max_drawdown: f64,
    position: Signal,
    entry_price: f64,
    entry_time: i64,

    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,

    ticks_processed: u64,
    first_timestamp: Option<i64>,
    last_timestamp: i64,
    last_mid: f64,
}

impl Backtester {
    pub fn new(config: BacktestConfig) -> Self {
        let window = config.window;
        let initial_capital = config.initial_capital;
        Self {
            config,
            stats: RollingStatistics::new(window),
            signals: SignalGenerator::new(DEFAULT_THRESHOLD),
            equity: initial_capital,
            peak_equity: initial_capital,
            max_drawdown: 0.0,
            position: Signal::Flat,
            entry_price: 0.0,
            entry_time: 0,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            ticks_processed: 0,
            first_timestamp: None,
            last_timestamp: 0,
            last_mid: 0.0,
        }
    }

    /// Reset all run state for a fresh pass with the given threshold.
    ///
    /// `tick_hint` sizes the log preallocations; transitions are sparse
    /// relative to ticks, so only a fraction is reserved.
    pub fn prepare(&mut self, threshold: f64, tick_hint: usize) {
        self.stats = RollingStatistics::new(self.config.window);
        self.signals = SignalGenerator::new(threshold);
        self.equity = self.config.initial_capital;
        self.peak_equity = self.config.initial_capital;
        self.max_drawdown = 0.0;
        self.position = Signal::Flat;
        self.entry_price = 0.0;
        self.entry_time = 0;
        self.trades.clear();
        self.equity_curve.clear();
        self.trades.reserve(tick_hint / 128);
        self.equity_curve.reserve(tick_hint / 64);
        self.ticks_processed = 0;
        self.first_timestamp = None;
        self.last_timestamp = 0;
        self.last_mid = 0.0;
    }

    /// Run a full backtest over the quote file, inline on the calling
    /// thread.
    pub fn run<P: AsRef<Path>>(&mut self, path: P, threshold: f64) -> Result<PerformanceMetrics> {
        info!(
            "Starting backtest: data={}, threshold={:.2}",
            path.as_ref().display(),
            threshold
        );

        let start = Instant::now();
        let mut reader = TickReader::open(path)?;
        self.prepare(threshold, reader.approximate_tick_count());

        while let Some(tick) = reader.next_tick() {
            self.process_tick(&tick);

            if self.ticks_processed % 100_000 == 0 {
                let rate = self.ticks_processed as f64 / start.elapsed().as_secs_f64();
                debug!(
                    "Processed {} ticks, rate: {:.0} ticks/sec",
                    self.ticks_processed, rate
                );
            }
        }

        Ok(self.finish(start.elapsed()))
    }

    /// Feed one tick through statistics, signal generation and execution.
    #[inline]
    pub fn process_tick(&mut self, tick: &Tick) {
        let mid = tick.mid();
        self.stats.update(mid);
        let signal = self.signals.generate(mid, &self.stats);

        self.ticks_processed += 1;
        if self.first_timestamp.is_none() {
            self.first_timestamp = Some(tick.timestamp);
        }
        self.last_timestamp = tick.timestamp;
        self.last_mid = mid;

        if signal != self.position {
            self.transition(signal, mid, tick.timestamp);
        }
    }

    /// Force-close any open position at the last observed quote and
    /// aggregate the run into metrics.
    pub fn finish(&mut self, elapsed: Duration) -> PerformanceMetrics {
        self.force_close();
        let metrics = PerformanceMetrics::compute(self, elapsed);
        info!(
            "Backtest complete: sharpe={:.2}, max_drawdown={:.2}%, {:.0} ticks/sec",
            metrics.sharpe_ratio,
            metrics.max_drawdown * 100.0,
            self.ticks_processed as f64 / elapsed.as_secs_f64().max(f64::MIN_POSITIVE),
        );
        metrics
    }

    /// Serialize the equity curve to `<prefix>.csv` and the trade log to
    /// `<prefix>_trades.csv`.
    pub fn write_results(&self, prefix: &str) -> Result<()> {
        report::write_equity_curve(format!("{prefix}.csv"), &self.equity_curve)?;
        report::write_trade_log(format!("{prefix}_trades.csv"), &self.trades)?;
        Ok(())
    }

    fn transition(&mut self, signal: Signal, mid: f64, t: i64) {
        if self.position != Signal::Flat {
            self.close_position(mid, t);
        }
        if signal != Signal::Flat {
            self.open_position(signal, mid, t);
        }
        self.record_equity(t);
    }

    fn close_position(&mut self, mid: f64, t: i64) {
        let direction = match self.position {
            Signal::Long => Direction::Long,
            Signal::Short => Direction::Short,
            Signal::Flat => return,
        };

        // Closing walks the book one tick against us.
        let exit_fill = match direction {
            Direction::Long => mid - self.config.slippage,
            Direction::Short => mid + self.config.slippage,
        };
        let gross = match direction {
            Direction::Long => self.config.multiplier * (exit_fill - self.entry_price),
            Direction::Short => self.config.multiplier * (self.entry_price - exit_fill),
        };
        let pnl = gross - self.config.commission;

        self.equity += pnl;
        self.trades.push(Trade {
            entry_time: self.entry_time,
            exit_time: t,
            entry_price: self.entry_price,
            exit_price: exit_fill,
            direction,
            pnl,
            duration_us: t - self.entry_time,
        });
        self.position = Signal::Flat;
    }

    fn open_position(&mut self, signal: Signal, mid: f64, t: i64) {
        let fill = match signal {
            Signal::Long => mid + self.config.slippage,
            Signal::Short => mid - self.config.slippage,
            Signal::Flat => return,
        };

        self.entry_price = fill;
        self.entry_time = t;
        self.position = signal;
        self.equity -= self.config.commission;
    }

    fn record_equity(&mut self, t: i64) {
        self.equity_curve.push(EquityPoint {
            timestamp: t,
            equity: self.equity,
        });

        if self.equity > self.peak_equity {
            self.peak_equity = self.equity;
        }
        let drawdown = (self.peak_equity - self.equity) / self.peak_equity;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
    }

    fn force_close(&mut self) {
        if self.position != Signal::Flat {
            let (mid, t) = (self.last_mid, self.last_timestamp);
            self.close_position(mid, t);
            self.record_equity(t);
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn peak_equity(&self) -> f64 {
        self.peak_equity
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    pub fn position(&self) -> Signal {
        self.position
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn ticks_processed(&self) -> u64 {
        self.ticks_processed
    }

    pub(crate) fn first_timestamp(&self) -> Option<i64> {
        self.first_timestamp
    }

    pub(crate) fn last_timestamp(&self) -> i64 {
        self.last_timestamp
    }
}
