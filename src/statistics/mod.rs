//! Online rolling statistics
//!
//! Two-phase estimator of the mid-price mean and variance. The first `W`
//! samples run Welford's recurrence so the estimate equals the exact sample
//! moments; from sample `W+1` on, an exponentially-weighted recurrence with
//! decay `alpha = 2/(W+1)` tracks regime change in O(1) state. Readiness
//! gates the z-score: it is meaningful as soon as the fill phase completes.

/// Default rolling window size in samples.
pub const DEFAULT_WINDOW: usize = 20_000;

/// Z-scores collapse to zero below this standard deviation.
const MIN_STDDEV: f64 = 1e-10;

/// Online mean/variance estimator for the mid-price stream.
///
/// Single-writer: `update` is called from one thread. Every accessor reads
/// plain scalars, so readers racing a writer in a pipelined deployment see a
/// momentarily inconsistent (mean, variance) pair but never a torn value.
#[derive(Debug, Clone)]
pub struct RollingStatistics {
    window: usize,
    alpha: f64,
    mean: f64,
    variance: f64,
    m2: f64,
    count: u64,
}

impl RollingStatistics {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            alpha: 2.0 / (window as f64 + 1.0),
            mean: 0.0,
            variance: 0.0,
            m2: 0.0,
            count: 0,
        }
    }

    /// Absorb one sample. Constant-time, no allocation.
    #[inline]
    pub fn update(&mut self, x: f64) {
        if self.count == 0 {
            self.mean = x;
            self.variance = 0.0;
            self.m2 = 0.0;
            self.count = 1;
            return;
        }

        if self.count < self.window as u64 {
            // Fill phase: Welford's recurrence, variance denominator is the
            // post-increment count.
            let count = self.count + 1;
            let delta = x - self.mean;
            self.mean += delta / count as f64;
            let delta2 = x - self.mean;
            self.m2 += delta * delta2;
            self.variance = self.m2 / count as f64;
            self.count = count;
        } else {
            // Steady state: EW recurrence against the pre-update mean.
            let mean_old = self.mean;
            self.mean = self.alpha * x + (1.0 - self.alpha) * mean_old;
            let delta = x - mean_old;
            self.variance = (1.0 - self.alpha) * (self.variance + self.alpha * delta * delta);
            if self.variance < 0.0 {
                self.variance = 0.0;
            }
            self.count += 1;
        }
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[inline]
    pub fn variance(&self) -> f64 {
        self.variance
    }

    #[inline]
    pub fn stddev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Standardized deviation of `x` from the rolling mean.
    ///
    /// Zero whenever the standard deviation is degenerate.
    #[inline]
    pub fn zscore(&self, x: f64) -> f64 {
        let sd = self.stddev();
        if sd > MIN_STDDEV {
            (x - self.mean) / sd
        } else {
            0.0
        }
    }

    /// True once the fill phase has absorbed a full window.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.count >= self.window as u64
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Default for RollingStatistics {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
