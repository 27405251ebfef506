//! Tick timing metrics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of jitter samples kept for percentile estimation.
pub const DEFAULT_MAX_SAMPLES: usize = 10_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Timing statistics of the loop.
///
/// Jitter is the distance between the deadline of a tick and the moment the timer released it.
/// A tick is missed if the work of the tick overran its deadline.
#[derive(Debug, Clone)]
pub struct TickMetrics {
    pub total_ticks: u64,

    pub missed_ticks: u64,

    /// Units: nanoseconds
    pub max_jitter_ns: u64,

    /// Recent jitter samples, used as a ring buffer once full.
    samples: Vec<u64>,

    max_samples: usize,

    next_sample: usize,

    /// Scratch storage for percentile selection.
    scratch: Vec<u64>,
}

/// Serialisable summary of [`TickMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    pub total_ticks: u64,
    pub missed_ticks: u64,
    pub miss_rate: f64,

    /// Units: seconds
    pub max_jitter_s: f64,

    /// Units: seconds
    pub p99_jitter_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TickMetrics {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SAMPLES)
    }
}

impl TickMetrics {
    /// Create a new set of metrics keeping at most `max_samples` jitter samples.
    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            total_ticks: 0,
            missed_ticks: 0,
            max_jitter_ns: 0,
            samples: Vec::with_capacity(max_samples),
            max_samples,
            next_sample: 0,
            scratch: Vec::with_capacity(max_samples),
        }
    }

    /// Record the timing of one tick.
    pub fn record_tick(&mut self, jitter_ns: u64, missed: bool) {
        self.total_ticks += 1;
        if missed {
            self.missed_ticks += 1;
        }
        self.max_jitter_ns = self.max_jitter_ns.max(jitter_ns);

        if self.max_samples == 0 {
            return;
        }

        if self.samples.len() < self.max_samples {
            self.samples.push(jitter_ns);
        } else {
            self.samples[self.next_sample] = jitter_ns;
            self.next_sample = (self.next_sample + 1) % self.max_samples;
        }
    }

    /// Fraction of ticks which missed their deadline, in `[0, 1]`.
    pub fn miss_rate(&self) -> f64 {
        if self.total_ticks == 0 {
            0.0
        } else {
            self.missed_ticks as f64 / self.total_ticks as f64
        }
    }

    /// Jitter at the given percentile (`0` to `1`) of the recent samples, or 0 if there are none.
    pub fn percentile_jitter_ns(&mut self, percentile: f64) -> u64 {
        if self.samples.is_empty() {
            return 0;
        }

        let percentile = percentile.max(0.0).min(1.0);

        self.scratch.clear();
        self.scratch.extend_from_slice(&self.samples);

        let len = self.scratch.len();
        let index = ((len as f64 * percentile) as usize).min(len - 1);
        let (_, value, _) = self.scratch.select_nth_unstable(index);

        *value
    }

    pub fn p99_jitter_ns(&mut self) -> u64 {
        self.percentile_jitter_ns(0.99)
    }

    pub fn summary(&mut self) -> TimingSummary {
        TimingSummary {
            total_ticks: self.total_ticks,
            missed_ticks: self.missed_ticks,
            miss_rate: self.miss_rate(),
            max_jitter_s: self.max_jitter_ns as f64 * 1e-9,
            p99_jitter_s: self.p99_jitter_ns() as f64 * 1e-9,
        }
    }
}
