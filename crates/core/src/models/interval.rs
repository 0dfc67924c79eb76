use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{SchedulerError, SchedulerResult};

/// 调度周期单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalPeriod {
    /// 仅执行一次
    Once,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl IntervalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalPeriod::Once => "once",
            IntervalPeriod::Minute => "minute",
            IntervalPeriod::Hour => "hour",
            IntervalPeriod::Day => "day",
            IntervalPeriod::Week => "week",
            IntervalPeriod::Month => "month",
            IntervalPeriod::Year => "year",
        }
    }

    /// 周期是否以天为最小粒度（固定时刻只对这些周期生效）
    pub fn is_calendar_based(&self) -> bool {
        matches!(
            self,
            IntervalPeriod::Day | IntervalPeriod::Week | IntervalPeriod::Month | IntervalPeriod::Year
        )
    }
}

impl fmt::Display for IntervalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalPeriod {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(IntervalPeriod::Once),
            "minute" => Ok(IntervalPeriod::Minute),
            "hour" => Ok(IntervalPeriod::Hour),
            "day" => Ok(IntervalPeriod::Day),
            "week" => Ok(IntervalPeriod::Week),
            "month" => Ok(IntervalPeriod::Month),
            "year" => Ok(IntervalPeriod::Year),
            other => Err(SchedulerError::InvalidInterval {
                value: s.to_string(),
                message: format!("未知的周期单位: {other}"),
            }),
        }
    }
}

/// 任务调度间隔
///
/// 紧凑地描述一条重复规则：周期单位 + 重复次数 + 可选的固定时刻。
/// 与执行逻辑解耦，每次执行后都能从同一个定义推导出下一次执行时间。
///
/// # 编码格式
///
/// `{period};{every};{start};{HH:MM:SS};{weekdays}`
///
/// - `period`: once/minute/hour/day/week/month/year
/// - `every`: 重复次数，取值 1..=10000
/// - `start`: RFC3339 格式的起始时间
/// - `HH:MM:SS`: 固定执行时刻，可为空
/// - `weekdays`: 逗号分隔的允许星期（Mon,Tue...），可为空
///
/// ```rust
/// use webfarm_core::models::{IntervalPeriod, TaskInterval};
///
/// let interval: TaskInterval = "hour;1;2024-01-01T00:00:00+00:00;;".parse().unwrap();
/// assert_eq!(interval.period, IntervalPeriod::Hour);
/// assert_eq!(interval.every, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInterval {
    pub period: IntervalPeriod,
    pub every: u32,
    pub start_time: DateTime<Utc>,
    pub specific_time: Option<NaiveTime>,
    pub days: Vec<Weekday>,
}

impl TaskInterval {
    /// 解码时允许的最大重复次数
    pub const MAX_EVERY: u32 = 10_000;

    pub fn new(period: IntervalPeriod, every: u32, start_time: DateTime<Utc>) -> Self {
        Self {
            period,
            every,
            start_time,
            specific_time: None,
            days: Vec::new(),
        }
    }

    pub fn once(at: DateTime<Utc>) -> Self {
        Self::new(IntervalPeriod::Once, 1, at)
    }

    pub fn with_specific_time(mut self, time: NaiveTime) -> Self {
        self.specific_time = Some(time);
        self
    }

    pub fn with_days(mut self, days: Vec<Weekday>) -> Self {
        self.days = days;
        self
    }

    pub fn is_once(&self) -> bool {
        self.period == IntervalPeriod::Once
    }

    /// 编码为持久化字符串
    pub fn encode(&self) -> String {
        let time = self
            .specific_time
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_default();
        let days = self
            .days
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{};{};{};{};{}",
            self.period,
            self.every,
            self.start_time.to_rfc3339(),
            time,
            days
        )
    }

    /// 从持久化字符串解码
    pub fn decode(value: &str) -> SchedulerResult<Self> {
        let invalid = |message: String| SchedulerError::InvalidInterval {
            value: value.to_string(),
            message,
        };

        let parts: Vec<&str> = value.split(';').collect();
        if parts.len() != 5 {
            return Err(invalid(format!("期望5个字段, 实际{}个", parts.len())));
        }

        let period: IntervalPeriod = parts[0].parse()?;

        let every: u32 = parts[1]
            .trim()
            .parse()
            .map_err(|e| invalid(format!("无效的重复次数: {e}")))?;
        if every == 0 {
            return Err(invalid("重复次数必须大于0".to_string()));
        }
        if every > Self::MAX_EVERY {
            return Err(invalid(format!("重复次数不能超过{}", Self::MAX_EVERY)));
        }

        let start_time = DateTime::parse_from_rfc3339(parts[2].trim())
            .map_err(|e| invalid(format!("无效的起始时间: {e}")))?
            .with_timezone(&Utc);

        let specific_time = match parts[3].trim() {
            "" => None,
            s => Some(
                NaiveTime::parse_from_str(s, "%H:%M:%S")
                    .map_err(|e| invalid(format!("无效的固定时刻: {e}")))?,
            ),
        };

        let mut days = Vec::new();
        for day in parts[4].split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let weekday = Weekday::from_str(day)
                .map_err(|_| invalid(format!("无效的星期: {day}")))?;
            if !days.contains(&weekday) {
                days.push(weekday);
            }
        }

        Ok(Self {
            period,
            every,
            start_time,
            specific_time,
            days,
        })
    }
}

impl fmt::Display for TaskInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for TaskInterval {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for TaskInterval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for TaskInterval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TaskInterval::decode(&raw).map_err(serde::de::Error::custom)
    }
}
