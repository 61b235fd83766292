/// Validation-rate anomaly detection
///
/// A pure statistical check; the orchestrator decides what a positive
/// flag means (it marks the record suspicious, it never rejects the
/// in-flight request).

/// A license is flagged when its observed rate exceeds the configured
/// baseline by this factor.
pub const ANOMALY_MULTIPLIER: f64 = 10.0;

/// Check whether `validation_count` observations inside `window_secs`
/// amount to an abnormal per-hour rate.
///
/// The count is normalized to a per-hour rate and compared against
/// `baseline_per_hour * ANOMALY_MULTIPLIER`. A non-positive window is
/// never anomalous (and guards the division).
pub fn is_anomalous(validation_count: i64, window_secs: i64, baseline_per_hour: f64) -> bool {
    if window_secs <= 0 {
        return false;
    }

    let rate_per_hour = validation_count as f64 * 3600.0 / window_secs as f64;
    rate_per_hour > baseline_per_hour * ANOMALY_MULTIPLIER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_above_threshold_is_anomalous() {
        // 1001 validations in an hour against a baseline of 100/h.
        assert!(is_anomalous(1001, 3600, 100.0));
    }

    #[test]
    fn test_rate_below_threshold_is_normal() {
        assert!(!is_anomalous(999, 3600, 100.0));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // Exactly baseline * 10 is still normal.
        assert!(!is_anomalous(1000, 3600, 100.0));
    }

    #[test]
    fn test_zero_window_is_never_anomalous() {
        assert!(!is_anomalous(0, 0, 100.0));
        assert!(!is_anomalous(1, 0, 100.0));
        assert!(!is_anomalous(1_000_000, 0, 100.0));
        assert!(!is_anomalous(1_000_000, -5, 100.0));
    }

    #[test]
    fn test_short_window_normalization() {
        // 20 validations in 60 seconds = 1200/h, over a 100/h baseline.
        assert!(is_anomalous(20, 60, 100.0));
        // 10 in 60 seconds = 600/h, under the 1000/h threshold.
        assert!(!is_anomalous(10, 60, 100.0));
    }

    #[test]
    fn test_baseline_is_tunable() {
        // The same observation flips with a stricter baseline.
        assert!(!is_anomalous(50, 3600, 100.0));
        assert!(is_anomalous(50, 3600, 1.0));
    }
}
