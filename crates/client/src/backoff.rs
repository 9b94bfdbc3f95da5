// crates/client/src/backoff.rs
//! Poll-interval backoff.

use std::time::Duration;

use crate::config::MonitorConfig;

/// Next poll interval for a given consecutive-failure count.
///
/// Pure function of the count. Below `backoff_threshold` the baseline
/// interval is returned unchanged; an isolated blip should not slow
/// down a healthy session. At and above the threshold the interval
/// grows geometrically, `baseline × factor^(n − threshold)`, capped at
/// `max_poll_interval`. A success resets the count to zero, which lands
/// back on the baseline.
pub fn backoff_interval(config: &MonitorConfig, consecutive_failures: u32) -> Duration {
    if consecutive_failures < config.backoff_threshold {
        return config.poll_interval;
    }
    let exponent = (consecutive_failures - config.backoff_threshold).min(i32::MAX as u32) as i32;
    let scaled = config.poll_interval.as_secs_f64() * config.backoff_factor.powi(exponent);
    Duration::from_secs_f64(scaled.min(config.max_poll_interval.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MonitorConfig {
        MonitorConfig::default()
    }

    #[test]
    fn test_baseline_below_threshold() {
        let cfg = config();
        assert_eq!(backoff_interval(&cfg, 0), cfg.poll_interval);
        assert_eq!(backoff_interval(&cfg, 1), cfg.poll_interval);
    }

    #[test]
    fn test_geometric_growth_past_threshold() {
        let cfg = config();
        // 3s × 1.5^0, 3s × 1.5^1, 3s × 1.5^2
        assert_eq!(backoff_interval(&cfg, 2), Duration::from_secs(3));
        assert_eq!(backoff_interval(&cfg, 3), Duration::from_secs_f64(4.5));
        assert_eq!(backoff_interval(&cfg, 4), Duration::from_secs_f64(6.75));
    }

    #[test]
    fn test_capped_at_ceiling() {
        let cfg = config();
        assert_eq!(backoff_interval(&cfg, 10), cfg.max_poll_interval);
        assert_eq!(backoff_interval(&cfg, 100), cfg.max_poll_interval);
    }

    #[test]
    fn test_monotonic_until_success() {
        let cfg = config();
        let mut prev = Duration::ZERO;
        for failures in 0..40 {
            let next = backoff_interval(&cfg, failures);
            assert!(next >= prev, "interval shrank at {failures} failures");
            prev = next;
        }
        // Success resets the count, which lands back on the baseline.
        assert_eq!(backoff_interval(&cfg, 0), cfg.poll_interval);
    }
}
