use chrono::{DateTime, Timelike, Utc};

/// Truncates a timestamp to the top of its hour. This is the cycle
/// identifier for a pipeline run: `created_at` of every forecast and
/// prediction produced by that run shares this value.
pub fn quantize_to_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

/// Horizon in hours (fractional, 15-minute granularity) from a cycle to a
/// prediction target.
pub fn horizon_hours(cycle: DateTime<Utc>, prediction_time: DateTime<Utc>) -> f64 {
    (prediction_time - cycle).num_seconds() as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn quantize_truncates_minutes_and_seconds() {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 14, 37, 22).unwrap();
        let q = quantize_to_hour(t);
        assert_eq!(q, Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap());
    }

    #[test]
    fn horizon_hours_handles_quarter_hour_steps() {
        let cycle = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let target = Utc.with_ymd_and_hms(2024, 6, 1, 0, 15, 0).unwrap();
        assert!((horizon_hours(cycle, target) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn horizon_hours_handles_72h_span() {
        let cycle = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let target = cycle + chrono::Duration::hours(72);
        assert!((horizon_hours(cycle, target) - 72.0).abs() < 1e-9);
    }
}
