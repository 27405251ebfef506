//! Loop timer
//!
//! The [`Timer`] releases the loop once per period against absolute deadlines, so that the time
//! taken by the work of each tick does not add up over a run. How the remaining time of a tick is
//! spent is chosen by [`WaitMode`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod metrics;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub use metrics::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time before the deadline at which hybrid waiting stops sleeping and starts spinning.
pub const SPIN_TAIL: Duration = Duration::from_micros(80);

/// Below this remaining time hybrid waiting only spins.
pub const SPIN_ONLY_THRESHOLD: Duration = Duration::from_micros(100);

/// Minimum number of ticks before the miss rate is compared to the acceptable rate.
pub const MIN_TICKS_FOR_MISS_RATE: u64 = 100;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fixed period loop timer.
#[derive(Debug)]
pub struct Timer {
    period: Duration,

    mode: WaitMode,

    /// Miss rate above which a warning is raised.
    acceptable_miss_rate: f64,

    /// Deadline of the current tick.
    deadline: Instant,

    metrics: TickMetrics,

    /// True while the miss rate is above the acceptable rate.
    miss_rate_exceeded: bool,
}

/// Timing of a single tick, as returned by [`Timer::wait`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickTiming {
    /// True if the tick overran its deadline.
    pub missed: bool,

    /// Distance between the deadline and the release of the tick.
    pub jitter: Duration,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Strategy used to wait for the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitMode {
    /// Do not wait, ticks run back to back. Used for replay and tests.
    None,

    /// Sleep the thread until the deadline.
    Sleep,

    /// Spin until the deadline.
    Busy,

    /// Sleep until shortly before the deadline then spin.
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimerError {
    #[error("The timer period must be greater than zero")]
    ZeroPeriod,

    #[error("The acceptable miss rate must be between 0 and 1, found {0}")]
    InvalidMissRate(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Timer {
    /// Create a new timer. The first deadline is one period from now.
    pub fn new(
        period: Duration,
        mode: WaitMode,
        acceptable_miss_rate: f64,
    ) -> Result<Self, TimerError> {
        if period == Duration::from_secs(0) {
            return Err(TimerError::ZeroPeriod);
        }
        if !(0.0..=1.0).contains(&acceptable_miss_rate) {
            return Err(TimerError::InvalidMissRate(acceptable_miss_rate));
        }

        Ok(Self {
            period,
            mode,
            acceptable_miss_rate,
            deadline: Instant::now() + period,
            metrics: TickMetrics::default(),
            miss_rate_exceeded: false,
        })
    }

    /// Restart the timer, the next deadline is one period from now.
    ///
    /// Metrics are kept.
    pub fn restart(&mut self) {
        self.deadline = Instant::now() + self.period;
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn mode(&self) -> WaitMode {
        self.mode
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut TickMetrics {
        &mut self.metrics
    }

    /// Wait until the end of the current tick.
    ///
    /// If the deadline has already passed the tick is counted as missed and the timer resyncs to
    /// one period from now rather than releasing a burst of late ticks.
    pub fn wait(&mut self) -> TickTiming {
        let timing = if self.mode == WaitMode::None {
            TickTiming {
                missed: false,
                jitter: Duration::from_secs(0),
            }
        } else {
            self.wait_for_deadline()
        };

        self.metrics
            .record_tick(timing.jitter.as_nanos() as u64, timing.missed);
        self.check_miss_rate();

        timing
    }

    fn wait_for_deadline(&mut self) -> TickTiming {
        let now = Instant::now();

        if now > self.deadline {
            let jitter = now - self.deadline;
            self.deadline = now + self.period;
            return TickTiming {
                missed: true,
                jitter,
            };
        }

        match self.mode {
            WaitMode::Sleep => std::thread::sleep(self.deadline - now),
            WaitMode::Busy => spin_until(self.deadline),
            WaitMode::Hybrid => {
                let remaining = self.deadline - now;
                if remaining >= SPIN_ONLY_THRESHOLD {
                    std::thread::sleep(remaining - SPIN_TAIL);
                }
                spin_until(self.deadline);
            }
            WaitMode::None => (),
        }

        let released = Instant::now();
        let jitter = released.saturating_duration_since(self.deadline);
        self.deadline += self.period;

        TickTiming {
            missed: false,
            jitter,
        }
    }

    /// Raise a warning when the miss rate crosses the acceptable rate.
    fn check_miss_rate(&mut self) {
        if self.metrics.total_ticks < MIN_TICKS_FOR_MISS_RATE {
            return;
        }

        let rate = self.metrics.miss_rate();
        if rate > self.acceptable_miss_rate && !self.miss_rate_exceeded {
            warn!(
                "Loop miss rate {:.2} % exceeds the acceptable {:.2} % ({} of {} ticks)",
                rate * 100.0,
                self.acceptable_miss_rate * 100.0,
                self.metrics.missed_ticks,
                self.metrics.total_ticks
            );
            self.miss_rate_exceeded = true;
        } else if rate <= self.acceptable_miss_rate && self.miss_rate_exceeded {
            info!("Loop miss rate back to {:.2} %", rate * 100.0);
            self.miss_rate_exceeded = false;
        }
    }

    /// True if the miss rate is currently above the acceptable rate.
    pub fn miss_rate_exceeded(&self) -> bool {
        self.miss_rate_exceeded
    }
}

fn spin_until(deadline: Instant) {
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_invalid() {
        assert_eq!(
            Timer::new(Duration::from_secs(0), WaitMode::Hybrid, 0.05).err(),
            Some(TimerError::ZeroPeriod)
        );
        assert_eq!(
            Timer::new(Duration::from_millis(1), WaitMode::Hybrid, 1.5).err(),
            Some(TimerError::InvalidMissRate(1.5))
        );
    }

    #[test]
    fn test_no_wait() {
        let mut timer = Timer::new(Duration::from_secs(1), WaitMode::None, 0.05).unwrap();

        let start = Instant::now();
        for _ in 0..1000 {
            assert!(!timer.wait().missed);
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(timer.metrics().total_ticks, 1000);
        assert_eq!(timer.metrics().missed_ticks, 0);
    }

    #[test]
    fn test_period_respected() {
        for mode in [WaitMode::Sleep, WaitMode::Busy, WaitMode::Hybrid].iter() {
            let mut timer = Timer::new(Duration::from_millis(2), *mode, 0.5).unwrap();
            timer.restart();

            let start = Instant::now();
            for _ in 0..10 {
                timer.wait();
            }

            // Absolute deadlines never release early
            assert!(start.elapsed() >= Duration::from_millis(18));
            assert_eq!(timer.metrics().total_ticks, 10);
        }
    }

    #[test]
    fn test_overrun_counts_as_miss() {
        let mut timer = Timer::new(Duration::from_millis(1), WaitMode::Hybrid, 0.05).unwrap();
        timer.restart();

        std::thread::sleep(Duration::from_millis(5));
        let timing = timer.wait();

        assert!(timing.missed);
        assert!(timing.jitter >= Duration::from_millis(3));
        assert_eq!(timer.metrics().missed_ticks, 1);
    }

    #[test]
    fn test_miss_rate_flag() {
        let mut timer = Timer::new(Duration::from_millis(1), WaitMode::None, 0.05).unwrap();

        for i in 0..MIN_TICKS_FOR_MISS_RATE {
            timer.metrics_mut().record_tick(0, i % 10 == 0);
        }
        timer.check_miss_rate();
        assert!(timer.miss_rate_exceeded());

        for _ in 0..1000 {
            timer.wait();
        }
        assert!(!timer.miss_rate_exceeded());
    }
}
