//! Network statistics shown on the landing page.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// GPU hours served as of [`GROWTH_EPOCH_MS`].
pub const BASE_GPU_HOURS: i64 = 18_764;
/// Hours added per whole day since the epoch.
pub const DAILY_GROWTH_HOURS: i64 = 7;
/// 2024-01-01T00:00:00Z.
pub const GROWTH_EPOCH_MS: i64 = 1_704_067_200_000;
/// Random jitter range applied to the estimate.
pub const VARIATION: std::ops::Range<i64> = -5..15;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// `GET /api/gpu` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuHours {
    pub hours: i64,
}

/// Estimated GPU hours at `now` with an explicit jitter.
pub fn gpu_hours(now: DateTime<Utc>, variation: i64) -> GpuHours {
    let days = (now.timestamp_millis() - GROWTH_EPOCH_MS).div_euclid(MS_PER_DAY);
    GpuHours {
        hours: BASE_GPU_HOURS + days * DAILY_GROWTH_HOURS + variation,
    }
}

/// Estimated GPU hours right now, with random jitter.
pub fn gpu_hours_now() -> GpuHours {
    let variation = rand::thread_rng().gen_range(VARIATION);
    gpu_hours(Utc::now(), variation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_epoch_day_is_base() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();
        assert_eq!(gpu_hours(now, 0).hours, BASE_GPU_HOURS);
    }

    #[test]
    fn test_growth_per_whole_day() {
        let now = Utc.with_ymd_and_hms(2024, 1, 11, 6, 0, 0).unwrap();
        assert_eq!(gpu_hours(now, 3).hours, BASE_GPU_HOURS + 70 + 3);
    }

    #[test]
    fn test_before_epoch_floors() {
        let now = Utc.with_ymd_and_hms(2023, 12, 31, 12, 0, 0).unwrap();
        assert_eq!(gpu_hours(now, 0).hours, BASE_GPU_HOURS - 7);
    }

    #[test]
    fn test_now_within_variation_bounds() {
        let today = gpu_hours(Utc::now(), 0).hours;
        let h = gpu_hours_now().hours;
        // A day boundary may pass between the two reads.
        assert!(h >= today - 5 && h < today + 15 + DAILY_GROWTH_HOURS);
    }

    #[test]
    fn test_body_shape() {
        let json = serde_json::to_string(&GpuHours { hours: 42 }).unwrap();
        assert_eq!(json, r#"{"hours":42}"#);
    }
}
