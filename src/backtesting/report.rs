//! CSV serialization of backtest results

use std::fs;
use std::path::Path;

use crate::backtesting::engine::{EquityPoint, Trade};
use crate::error::Result;

/// Write the equity curve as `timestamp,equity` with two-decimal equity.
pub fn write_equity_curve<P: AsRef<Path>>(path: P, curve: &[EquityPoint]) -> Result<()> {
    let mut out = String::with_capacity(32 + curve.len() * 32);
    out.push_str("timestamp,equity\n");
    for point in curve {
        out.push_str(&format!("{},{:.2}\n", point.timestamp, point.equity));
    }
    fs::write(path, out)?;
    Ok(())
}

/// Write the trade log with two-decimal prices/pnl and microsecond times.
pub fn write_trade_log<P: AsRef<Path>>(path: P, trades: &[Trade]) -> Result<()> {
    let mut out = String::with_capacity(64 + trades.len() * 80);
    out.push_str("entry_time,exit_time,entry_price,exit_price,direction,pnl,duration_us\n");
    for trade in trades {
        out.push_str(&format!(
            "{},{},{:.2},{:.2},{},{:.2},{}\n",
            trade.entry_time,
            trade.exit_time,
            trade.entry_price,
            trade.exit_price,
            trade.direction.as_str(),
            trade.pnl,
            trade.duration_us,
        ));
    }
    fs::write(path, out)?;
    Ok(())
}
