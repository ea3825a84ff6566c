//! Threaded pipeline runner
//!
//! Splits the memory-mapped reader from the compute stage across two OS
//! threads joined by a [`TickRing`]. The compute thread can be pinned to a
//! core to reduce scheduling jitter; pinning is best-effort and the run
//! proceeds unpinned when the platform refuses it.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use core_affinity::CoreId;
use tracing::{debug, info, warn};

use crate::backtesting::{Backtester, PerformanceMetrics};
use crate::data::TickReader;
use crate::error::{EngineError, Result};
use crate::pipeline::ring::TickRing;

/// Default ring capacity for the threaded deployment.
pub const DEFAULT_RING_CAPACITY: usize = 1 << 20;

/// Pin the current thread to a specific CPU core.
///
/// Prevents the OS from migrating the thread between cores, which causes
/// cache evictions and latency spikes.
pub fn pin_to_core(core: usize) -> Result<()> {
    if core_affinity::set_for_current(CoreId { id: core }) {
        info!("Pinned thread to CPU core {}", core);
        Ok(())
    } else {
        Err(EngineError::InvalidArgument(format!(
            "failed to pin thread to core {core}"
        )))
    }
}

/// Run a backtest with the reader and compute stages on separate threads.
///
/// Produces the same trades and equity curve as [`Backtester::run`]: the
/// single producer preserves file order through the ring, and the consumer
/// applies the identical per-tick pipeline.
pub fn run_piped<P: AsRef<Path>>(
    backtester: &mut Backtester,
    path: P,
    threshold: f64,
    ring_capacity: usize,
    pinned_core: Option<usize>,
) -> Result<PerformanceMetrics> {
    info!(
        "Starting piped backtest: data={}, threshold={:.2}, ring={}",
        path.as_ref().display(),
        threshold,
        ring_capacity
    );

    let start = Instant::now();
    let mut reader = TickReader::open(path)?;
    backtester.prepare(threshold, reader.approximate_tick_count());

    let ring = TickRing::new(ring_capacity)?;
    let done = AtomicBool::new(false);
    let pushed = AtomicU64::new(0);

    std::thread::scope(|scope| {
        let (ring, done, pushed) = (&ring, &done, &pushed);

        scope.spawn(move || {
            let mut count = 0u64;
            while let Some(tick) = reader.next_tick() {
                let mut boxed = Box::new(tick);
                // Backpressure: spin until the consumer frees a slot.
                loop {
                    match ring.push(boxed) {
                        Ok(()) => break,
                        Err(returned) => {
                            boxed = returned;
                            std::hint::spin_loop();
                        }
                    }
                }
                count += 1;
            }
            pushed.store(count, Ordering::Release);
            done.store(true, Ordering::Release);
        });

        let backtester = &mut *backtester;
        scope.spawn(move || {
            if let Some(core) = pinned_core {
                if let Err(err) = pin_to_core(core) {
                    warn!("CPU pinning unavailable: {err}");
                }
            }
            loop {
                match ring.pop() {
                    Some(tick) => backtester.process_tick(&tick),
                    None => {
                        if done.load(Ordering::Acquire) && ring.is_empty() {
                            break;
                        }
                        std::hint::spin_loop();
                    }
                }
            }
        });
    });

    debug!(
        "Pipeline drained: pushed={}, popped={}",
        pushed.load(Ordering::Acquire),
        backtester.ticks_processed()
    );
    Ok(backtester.finish(start.elapsed()))
}
