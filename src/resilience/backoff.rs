//! Exponential backoff.

use std::time::Duration;

/// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`.
///
/// With the default base of 0.1s the schedule is 0.1s, 0.2s, 0.4s, 0.8s.
pub fn calculate_backoff(retry: u32, base_secs: f64, max: Duration) -> Duration {
    if retry == 0 || base_secs <= 0.0 {
        return Duration::ZERO;
    }

    let factor = 2f64.powi(retry.saturating_sub(1).min(62) as i32);
    let delay = Duration::try_from_secs_f64(base_secs * factor).unwrap_or(max);
    delay.min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: Duration = Duration::from_secs(120);

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(calculate_backoff(0, 0.1, MAX), Duration::ZERO);
        assert_eq!(calculate_backoff(1, 0.1, MAX).as_millis(), 100);
        assert_eq!(calculate_backoff(2, 0.1, MAX).as_millis(), 200);
        assert_eq!(calculate_backoff(3, 0.1, MAX).as_millis(), 400);
        assert_eq!(calculate_backoff(4, 0.1, MAX).as_millis(), 800);
    }

    #[test]
    fn test_backoff_capped() {
        let capped = calculate_backoff(40, 0.1, Duration::from_secs(2));
        assert_eq!(capped, Duration::from_secs(2));
    }

    #[test]
    fn test_zero_base_disables_sleep() {
        assert_eq!(calculate_backoff(3, 0.0, MAX), Duration::ZERO);
    }
}
