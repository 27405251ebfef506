//! Waypoint structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A target configuration of the device tagged with a time offset.
///
/// The only state which may change after construction is the time tag, see
/// [`WayPoint::set_time`] and [`WayPoint::with_time`].
#[derive(Debug, Clone, PartialEq)]
pub struct WayPoint {
    /// Time offset of the waypoint.
    time: Duration,

    /// Target joint positions, one per degree of freedom.
    ///
    /// Units: radians
    positions: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WayPoint {
    /// Create a new waypoint.
    pub fn new(time: Duration, positions: Vec<f64>) -> Self {
        Self { time, positions }
    }

    /// Create a waypoint at time zero.
    pub fn at_zero(positions: Vec<f64>) -> Self {
        Self::new(Duration::from_secs(0), positions)
    }

    /// The time offset of this waypoint.
    pub fn time(&self) -> Duration {
        self.time
    }

    /// The target joint positions.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Number of degrees of freedom in the waypoint.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Rebind the time tag of this waypoint.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = time;
        self
    }

    /// Return a copy of this waypoint with a different time tag.
    pub fn with_time(&self, time: Duration) -> Self {
        Self {
            time,
            positions: self.positions.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rebind_time() {
        let neutral = WayPoint::at_zero(vec![-0.26, 0.0, 0.0, 0.0]);

        let timed = neutral.with_time(Duration::from_secs(2));
        assert_eq!(timed.time(), Duration::from_secs(2));
        assert_eq!(timed.positions(), neutral.positions());

        // The source waypoint is untouched
        assert_eq!(neutral.time(), Duration::from_secs(0));

        let mut wp = neutral.clone();
        wp.set_time(Duration::from_millis(500));
        assert_eq!(wp.time(), Duration::from_millis(500));
        assert_eq!(wp.len(), 4);
        assert!(!wp.is_empty());
    }
}
