use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use super::recorder::Metrics;

/// Periodically sleeps for `interval` and reports how late the runtime woke
/// the probe up. A busy or blocked runtime shows up as a growing lag.
pub fn spawn_lag_probe(metrics: Metrics, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let started = Instant::now();
            tokio::time::sleep(interval).await;
            let lag = started.elapsed().saturating_sub(interval);
            metrics.set_scheduler_lag(lag.as_secs_f64());
        }
    })
}
