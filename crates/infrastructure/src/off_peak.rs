//! 基于配置的非高峰时段

use chrono::{DateTime, Duration, NaiveTime, Utc};
use webfarm_core::{config::OffPeakConfig, traits::OffPeakService, SchedulerError, SchedulerResult};

/// 每天固定的非高峰窗口（UTC），只关心窗口的开始时刻
#[derive(Debug, Clone, Copy)]
pub struct ConfiguredOffPeakWindow {
    start: NaiveTime,
}

impl ConfiguredOffPeakWindow {
    pub fn new(start: NaiveTime) -> Self {
        Self { start }
    }

    pub fn from_config(config: &OffPeakConfig) -> SchedulerResult<Self> {
        let (start, _) = config
            .window()
            .map_err(|e| SchedulerError::Configuration(e.to_string()))?;
        Ok(Self::new(start))
    }
}

impl OffPeakService for ConfiguredOffPeakWindow {
    fn next_off_peak_start(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let candidate = after.date_naive().and_time(self.start).and_utc();
        if candidate > after {
            Some(candidate)
        } else {
            candidate.checked_add_signed(Duration::days(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> ConfiguredOffPeakWindow {
        ConfiguredOffPeakWindow::from_config(&OffPeakConfig::default()).unwrap()
    }

    #[test]
    fn test_next_start_same_day() {
        let after = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(
            window().next_off_peak_start(after),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 22, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_next_start_is_strictly_after() {
        let at_start = Utc.with_ymd_and_hms(2024, 3, 1, 22, 0, 0).unwrap();
        assert_eq!(
            window().next_off_peak_start(at_start),
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 22, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_custom_start_rolls_to_next_day() {
        let w = ConfiguredOffPeakWindow::new(NaiveTime::from_hms_opt(1, 0, 0).unwrap());
        assert_eq!(
            w.next_off_peak_start(Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 1, 0, 0).unwrap())
        );
    }
}
