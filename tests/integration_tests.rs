//! End-to-end runs over on-disk quote files.

use std::io::Write;

use reversion_lab::backtesting::{BacktestConfig, Backtester};
use reversion_lab::pipeline;
use reversion_lab::strategy::Signal;
use tempfile::NamedTempFile;

/// Deterministic mean-reverting path: a sawtooth around 4500 with deep
/// spikes every 97 ticks that stretch the z-score past entry thresholds.
fn write_quote_file(lines: usize, garbage: bool) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "timestamp,bid,ask,volume").unwrap();
    for i in 0..lines {
        if garbage && i % 211 == 0 {
            writeln!(file, "corrupt_line_with_no_fields").unwrap();
            writeln!(file, "4500,not_a_number").unwrap();
        }
        let wobble = ((i % 20) as f64 - 10.0) * 0.25;
        let spike = match i % 97 {
            13 => -8.0,
            51 => 8.0,
            _ => 0.0,
        };
        let mid = 4500.0 + wobble + spike;
        writeln!(
            file,
            "{},{:.2},{:.2},{}",
            (i as i64 + 1) * 1_000,
            mid - 0.25,
            mid + 0.25,
            10 + i % 50
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

fn small_config() -> BacktestConfig {
    BacktestConfig {
        window: 50,
        ..Default::default()
    }
}

#[test]
fn test_end_to_end_run_produces_consistent_metrics() {
    let file = write_quote_file(10_000, false);
    let mut bt = Backtester::new(small_config());
    let metrics = bt.run(file.path(), 1.5).unwrap();

    assert_eq!(metrics.ticks_processed, 10_000);
    assert!(metrics.total_trades > 0, "path never triggered a trade");
    assert_eq!(metrics.total_trades, bt.trades().len());
    assert_eq!(bt.position(), Signal::Flat);

    // Terminal accounting ties out against the reported return.
    let expected_return = (bt.equity() - 100_000.0) / 100_000.0;
    assert!((metrics.total_return - expected_return).abs() < 1e-12);

    assert!(bt.peak_equity() >= bt.equity());
    assert!((0.0..=1.0).contains(&metrics.max_drawdown));
    assert!(metrics.winning_trades <= metrics.total_trades);
    assert!(metrics.ticks_per_second > 0.0);

    for trade in bt.trades() {
        assert!(trade.entry_time < trade.exit_time);
        assert_eq!(trade.duration_us, trade.exit_time - trade.entry_time);
    }
    for pair in bt.equity_curve().windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[test]
fn test_malformed_records_backtest_the_valid_subset() {
    let clean = write_quote_file(5_000, false);
    let dirty = write_quote_file(5_000, true);

    let mut clean_bt = Backtester::new(small_config());
    let clean_metrics = clean_bt.run(clean.path(), 1.5).unwrap();

    let mut dirty_bt = Backtester::new(small_config());
    let dirty_metrics = dirty_bt.run(dirty.path(), 1.5).unwrap();

    // Garbage lines vanish without aborting or altering valid records.
    assert_eq!(clean_metrics.ticks_processed, dirty_metrics.ticks_processed);
    assert_eq!(clean_bt.trades(), dirty_bt.trades());
}

#[test]
fn test_rerun_is_deterministic() {
    let file = write_quote_file(5_000, false);
    let mut bt = Backtester::new(small_config());

    let first = bt.run(file.path(), 1.5).unwrap();
    let first_trades = bt.trades().to_vec();

    let second = bt.run(file.path(), 1.5).unwrap();
    assert_eq!(first.ticks_processed, second.ticks_processed);
    assert_eq!(first.total_trades, second.total_trades);
    assert_eq!(first.total_return, second.total_return);
    assert_eq!(first_trades, bt.trades());
}

#[test]
fn test_piped_run_matches_inline_at_file_level() {
    let file = write_quote_file(8_000, false);

    let mut inline_bt = Backtester::new(small_config());
    let inline_metrics = inline_bt.run(file.path(), 1.5).unwrap();

    let mut piped_bt = Backtester::new(small_config());
    let piped_metrics =
        pipeline::run_piped(&mut piped_bt, file.path(), 1.5, 1 << 14, None).unwrap();

    assert_eq!(inline_metrics.ticks_processed, piped_metrics.ticks_processed);
    assert_eq!(inline_bt.trades(), piped_bt.trades());
    assert_eq!(inline_bt.equity_curve(), piped_bt.equity_curve());
}

#[test]
fn test_write_results_round_trip() {
    let file = write_quote_file(10_000, false);
    let mut bt = Backtester::new(small_config());
    bt.run(file.path(), 1.5).unwrap();
    assert!(!bt.trades().is_empty());

    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run1");
    bt.write_results(prefix.to_str().unwrap()).unwrap();

    let equity_csv =
        std::fs::read_to_string(dir.path().join("run1.csv")).unwrap();
    let trades_csv =
        std::fs::read_to_string(dir.path().join("run1_trades.csv")).unwrap();

    let equity_lines: Vec<&str> = equity_csv.lines().collect();
    assert_eq!(equity_lines[0], "timestamp,equity");
    assert_eq!(equity_lines.len(), bt.equity_curve().len() + 1);

    let trade_lines: Vec<&str> = trades_csv.lines().collect();
    assert_eq!(
        trade_lines[0],
        "entry_time,exit_time,entry_price,exit_price,direction,pnl,duration_us"
    );
    assert_eq!(trade_lines.len(), bt.trades().len() + 1);

    for (line, trade) in trade_lines[1..].iter().zip(bt.trades()) {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[0], trade.entry_time.to_string());
        assert!(fields[4] == "LONG" || fields[4] == "SHORT");
        // Prices serialize with two decimals.
        let exit_price: f64 = fields[3].parse().unwrap();
        assert!((exit_price - trade.exit_price).abs() < 0.005 + 1e-9);
    }
}

#[test]
fn test_missing_input_file_fails_the_run() {
    let mut bt = Backtester::new(small_config());
    assert!(bt.run("/nonexistent/quotes.csv", 2.5).is_err());
    assert!(bt.trades().is_empty());
}

#[test]
fn test_all_garbage_file_reports_empty_metrics() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "timestamp,bid,ask,volume").unwrap();
    for _ in 0..100 {
        writeln!(file, "not,a,valid").unwrap();
    }
    file.flush().unwrap();

    let mut bt = Backtester::new(small_config());
    let metrics = bt.run(file.path(), 2.5).unwrap();
    assert_eq!(metrics.ticks_processed, 0);
    assert_eq!(metrics.total_trades, 0);
    assert_eq!(metrics.total_return, 0.0);
    assert_eq!(metrics.sharpe_ratio, 0.0);
    assert_eq!(metrics.ticks_per_second, 0.0);
}
