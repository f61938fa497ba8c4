//! # Tick Driver
//!
//! Fires the tick lifecycle at `tick_rate` Hz with the time since the
//! previous fire. Late ticks are skipped, not bunched.

use std::time::Duration;

use neutron_core::{Lifecycle, Scheduler};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Period between ticks at `tick_rate` Hz. A rate of zero is treated as one.
#[must_use]
pub fn tick_period(tick_rate: u32) -> Duration {
    Duration::from_secs(1) / tick_rate.max(1)
}

/// Spawns the driver. Abort the handle to stop it.
pub(crate) fn spawn_ticker(
    scheduler: &Scheduler,
    tick: Lifecycle<Duration>,
    tick_rate: u32,
) -> JoinHandle<()> {
    let period = tick_period(tick_rate);
    tracing::debug!("Tick driver at {} Hz ({:?})", tick_rate.max(1), period);

    scheduler.spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last = interval.tick().await;
        loop {
            let now = interval.tick().await;
            tick.fire(now - last).await;
            last = now;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_period() {
        assert_eq!(tick_period(1), Duration::from_secs(1));
        assert_eq!(tick_period(0), Duration::from_secs(1));
        assert_eq!(tick_period(50), Duration::from_millis(20));
    }
}
