//! Cooperative cancellation
//!
//! A [`CancellationSource`] owns a single atomic stop flag. Anything which may need to stop the
//! loop (the Ctrl-C handler, the loop itself) holds a [`StopLatch`] onto the flag. The loop polls
//! the flag once per tick, so a tick always completes before a stop is honoured.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Owner of the stop flag.
#[derive(Debug, Default)]
pub struct CancellationSource {
    flag: Arc<AtomicBool>,
}

/// Cloneable handle able to set and poll the stop flag.
///
/// Once set the latch cannot be cleared.
#[derive(Debug, Clone)]
pub struct StopLatch {
    flag: Arc<AtomicBool>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CancellationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a new handle onto the flag.
    pub fn latch(&self) -> StopLatch {
        StopLatch {
            flag: self.flag.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl StopLatch {
    /// Request a stop.
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once a stop has been requested.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
