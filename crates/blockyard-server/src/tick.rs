//! Fixed-rate tick pacing.
//!
//! The simulation runs off a tokio [`Interval`] that skips missed ticks
//! instead of bursting to catch up. [`TickSchedule`] owns the rate and
//! counts ticks that ran and ticks that were skipped.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Default simulation rate in Hz.
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Fixed-rate tick bookkeeping.
#[derive(Debug, Clone)]
pub struct TickSchedule {
    tick_duration: Duration,
    last_tick: Option<Instant>,
    total_ticks: u64,
    skipped_ticks: u64,
}

impl TickSchedule {
    /// Creates a schedule at `hz` ticks per second (at least 1).
    pub fn with_tick_rate(hz: u32) -> Self {
        Self {
            tick_duration: Duration::from_secs_f64(1.0 / hz.max(1) as f64),
            last_tick: None,
            total_ticks: 0,
            skipped_ticks: 0,
        }
    }

    /// Simulation step length in seconds.
    pub fn dt(&self) -> f32 {
        self.tick_duration.as_secs_f32()
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// A tokio interval at this rate that skips missed ticks.
    pub fn interval(&self) -> Interval {
        let mut interval = tokio::time::interval(self.tick_duration);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    }

    /// Record a tick firing at `now`. Returns how many tick slots were
    /// skipped since the previous tick.
    pub fn record(&mut self, now: Instant) -> u64 {
        let skipped = match self.last_tick {
            Some(previous) => {
                let periods = now.saturating_duration_since(previous).as_secs_f64() / self.tick_duration.as_secs_f64();
                (periods.round() as u64).saturating_sub(1)
            }
            None => 0,
        };
        self.last_tick = Some(now);
        self.total_ticks += 1;
        self.skipped_ticks += skipped;
        skipped
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self::with_tick_rate(DEFAULT_TICK_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rate() {
        let schedule = TickSchedule::default();
        assert!((schedule.dt() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_rate_clamped() {
        let schedule = TickSchedule::with_tick_rate(0);
        assert_eq!(schedule.tick_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_on_time_ticks_skip_nothing() {
        let mut schedule = TickSchedule::with_tick_rate(10);
        let start = Instant::now();
        assert_eq!(schedule.record(start), 0);
        assert_eq!(schedule.record(start + Duration::from_millis(100)), 0);
        assert_eq!(schedule.record(start + Duration::from_millis(201)), 0);
        assert_eq!(schedule.total_ticks(), 3);
        assert_eq!(schedule.skipped_ticks(), 0);
    }

    #[test]
    fn test_overrun_counts_skipped_ticks() {
        let mut schedule = TickSchedule::with_tick_rate(10);
        let start = Instant::now();
        schedule.record(start);
        assert_eq!(schedule.record(start + Duration::from_millis(400)), 3);
        assert_eq!(schedule.skipped_ticks(), 3);
        assert_eq!(schedule.total_ticks(), 2);
    }

    #[tokio::test]
    async fn test_interval_paces_ticks() {
        let schedule = TickSchedule::with_tick_rate(50);
        let mut interval = schedule.interval();
        let first = interval.tick().await;
        let second = interval.tick().await;
        assert!(second - first >= Duration::from_millis(19));
    }
}
