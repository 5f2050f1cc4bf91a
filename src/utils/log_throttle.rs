use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct WindowState {
    window_started_at: Instant,
    suppressed: u64,
}

/// Rate limiter for repetitive warnings, keyed by an arbitrary string.
#[derive(Debug)]
pub struct LogThrottle {
    interval: Duration,
    windows: HashMap<String, WindowState>,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        LogThrottle {
            interval,
            windows: HashMap::new(),
        }
    }

    /// Returns `Some(suppressed_count)` when a log for `key` should be emitted,
    /// otherwise `None` and the event is counted as suppressed for the active window.
    pub fn should_emit(&mut self, key: &str) -> Option<u64> {
        let now = Instant::now();

        match self.windows.get_mut(key) {
            Some(state) => {
                if now.duration_since(state.window_started_at) >= self.interval {
                    let suppressed = state.suppressed;
                    state.window_started_at = now;
                    state.suppressed = 0;
                    Some(suppressed)
                } else {
                    state.suppressed += 1;
                    None
                }
            }
            None => {
                self.windows.insert(
                    key.to_string(),
                    WindowState {
                        window_started_at: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LogThrottle;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn emits_then_suppresses_then_emits_with_count() {
        let mut throttle = LogThrottle::new(Duration::from_millis(20));

        assert_eq!(throttle.should_emit("loki.push"), Some(0));
        assert_eq!(throttle.should_emit("loki.push"), None);
        assert_eq!(throttle.should_emit("loki.push"), None);

        sleep(Duration::from_millis(30));
        assert_eq!(throttle.should_emit("loki.push"), Some(2));
    }

    #[test]
    fn keys_have_separate_windows() {
        let mut throttle = LogThrottle::new(Duration::from_secs(60));

        assert_eq!(throttle.should_emit("loki.push"), Some(0));
        assert_eq!(throttle.should_emit("loki.queue"), Some(0));
        assert_eq!(throttle.should_emit("loki.push"), None);
    }
}
