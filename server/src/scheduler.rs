//! Start/stop controller around the fixed-interval simulation timer.
//!
//! The scheduler does not run anything itself. The owning event loop awaits
//! [`TickScheduler::tick`] inside its `select!`; while stopped that future never
//! resolves, so an empty server sits idle.

use std::future;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};

#[derive(Debug)]
pub struct TickScheduler {
    period: Duration,
    timer: Option<Interval>,
}

impl TickScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            timer: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Starts ticking one period from now. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.timer.is_some() {
            return false;
        }

        let mut timer = interval_at(Instant::now() + self.period, self.period);
        // A late tick is dropped rather than replayed in a burst
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.timer = Some(timer);
        true
    }

    /// Cancels the timer. Returns false if it was not running.
    pub fn stop(&mut self) -> bool {
        self.timer.take().is_some()
    }

    /// Resolves at the next tick boundary; pending forever while stopped.
    pub async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const PERIOD: Duration = Duration::from_millis(100);

    #[test]
    fn test_starts_stopped() {
        let scheduler = TickScheduler::new(PERIOD);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.period(), PERIOD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let mut scheduler = TickScheduler::new(PERIOD);

        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert!(scheduler.is_running());

        let started = Instant::now();
        scheduler.tick().await;
        assert!(started.elapsed() >= PERIOD && started.elapsed() < PERIOD * 2);
        scheduler.tick().await;
        assert!(started.elapsed() >= PERIOD * 2 && started.elapsed() < PERIOD * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let mut scheduler = TickScheduler::new(PERIOD);
        scheduler.start();

        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_scheduler_never_ticks() {
        let mut scheduler = TickScheduler::new(PERIOD);
        assert!(timeout(PERIOD * 10, scheduler.tick()).await.is_err());

        scheduler.start();
        scheduler.stop();
        assert!(timeout(PERIOD * 10, scheduler.tick()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let mut scheduler = TickScheduler::new(PERIOD);
        scheduler.start();
        scheduler.stop();

        assert!(scheduler.start());
        assert!(timeout(PERIOD * 2, scheduler.tick()).await.is_ok());
    }
}
