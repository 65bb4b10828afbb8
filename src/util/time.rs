//! Time utilities for the tick loop

use std::time::{Duration, Instant};

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Simulation ticks per second
pub const TICK_RATE: u32 = 64;

/// Wall-clock period between two ticks
pub fn tick_period() -> Duration {
    Duration::from_micros(1_000_000 / TICK_RATE as u64)
}

/// Measures wall-clock time between consecutive laps.
///
/// The tick loop ages snowballs by the measured lap, not by `tick_period()`.
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Milliseconds since the previous lap (or creation), then restart.
    /// Sub-millisecond precision is kept.
    pub fn lap_ms(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.start).as_secs_f64() * 1000.0;
        self.start = now;
        elapsed
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_period_matches_rate() {
        assert_eq!(tick_period(), Duration::from_micros(15_625));
    }

    #[test]
    fn lap_resets_the_timer() {
        let mut timer = Timer::new();
        std::thread::sleep(Duration::from_millis(5));
        let first = timer.lap_ms();
        assert!(first >= 5.0);
        assert!(timer.lap_ms() < first);
    }
}
