use chrono::{DateTime, Datelike, Duration, Months, Utc};
use tracing::{debug, warn};

use webfarm_core::{
    models::{IntervalPeriod, TaskInterval},
    SchedulerResult,
};

/// 单次计算中最多推进的步数，防止异常间隔导致死循环
const MAX_ADVANCE_STEPS: usize = 100_000;

/// 调度间隔计算工具
///
/// 下一次执行时间从上一次计划时间推导，而不是从当前时间推导：
/// 迟到几分钟的任务只推进一个周期，错过的多个周期直接跳过，不做补偿执行。
pub struct IntervalScheduler {
    interval: TaskInterval,
}

impl IntervalScheduler {
    pub fn new(interval: TaskInterval) -> Self {
        Self { interval }
    }

    /// 从编码字符串创建
    pub fn parse(encoded: &str) -> SchedulerResult<Self> {
        Ok(Self::new(TaskInterval::decode(encoded)?))
    }

    pub fn interval(&self) -> &TaskInterval {
        &self.interval
    }

    /// 计算严格晚于 `now` 的下一次执行时间
    ///
    /// `previous` 是上一次计划执行时间。为 None 时任务尚未执行过，
    /// 起始时间对应的第一次执行本身就是候选。
    /// 一次性任务执行后不再有下一次执行时间；日期计算溢出时同样返回 None。
    pub fn next_run_time(
        &self,
        previous: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if self.interval.is_once() {
            return None;
        }

        let base = match previous {
            Some(previous) => previous,
            None => {
                let first = self.first_occurrence()?;
                if first > now {
                    return Some(first);
                }
                first
            }
        };

        let mut current = self.fast_forward(base, now)?;
        for _ in 0..MAX_ADVANCE_STEPS {
            let Some(next) = self.advance(current) else {
                warn!("调度间隔计算溢出: {}", self.interval);
                return None;
            };
            if next > now {
                debug!(
                    "计算下一次执行时间: 基准={}, 下次执行={}, 当前时间={}",
                    current.format("%Y-%m-%d %H:%M:%S UTC"),
                    next.format("%Y-%m-%d %H:%M:%S UTC"),
                    now.format("%Y-%m-%d %H:%M:%S UTC")
                );
                return Some(next);
            }
            current = next;
        }

        warn!("无法在有限步数内计算下一次执行时间: {}", self.interval);
        None
    }

    /// 执行频率描述
    pub fn frequency_description(&self) -> String {
        let interval = &self.interval;
        let unit = match interval.period {
            IntervalPeriod::Once => {
                return format!(
                    "一次性 ({})",
                    interval.start_time.format("%Y-%m-%d %H:%M:%S UTC")
                )
            }
            IntervalPeriod::Minute => "分钟",
            IntervalPeriod::Hour => "小时",
            IntervalPeriod::Day => "天",
            IntervalPeriod::Week => "周",
            IntervalPeriod::Month => "月",
            IntervalPeriod::Year => "年",
        };

        let mut description = if interval.every == 1 {
            format!("每{unit}")
        } else {
            format!("每 {} {unit}", interval.every)
        };
        if let Some(time) = interval.specific_time.filter(|_| interval.period.is_calendar_based()) {
            description.push_str(&format!(" {}", time.format("%H:%M:%S")));
        }
        if !interval.days.is_empty() && self.uses_weekdays() {
            let days: Vec<String> = interval.days.iter().map(|d| d.to_string()).collect();
            description.push_str(&format!(" ({})", days.join(",")));
        }
        description
    }

    /// 起始时间当天（或之后）第一个满足固定时刻与星期过滤的执行时间
    fn first_occurrence(&self) -> Option<DateTime<Utc>> {
        let start = self.interval.start_time;
        let aligned = self.align(start)?;
        if aligned >= start {
            Some(aligned)
        } else {
            self.advance(start)
        }
    }

    /// 推进一个周期，并应用固定时刻与星期过滤
    fn advance(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let every = self.interval.every;
        let next = match self.interval.period {
            IntervalPeriod::Once => return None,
            IntervalPeriod::Month => from.checked_add_months(Months::new(every))?,
            IntervalPeriod::Year => from.checked_add_months(Months::new(every.checked_mul(12)?))?,
            _ => from.checked_add_signed(self.fixed_step()?)?,
        };
        self.align(next)
    }

    fn align(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut aligned = at;
        if let Some(time) = self.interval.specific_time {
            if self.interval.period.is_calendar_based() {
                aligned = aligned.date_naive().and_time(time).and_utc();
            }
        }

        if self.uses_weekdays() && !self.interval.days.is_empty() {
            let mut checked = 0;
            while !self.interval.days.contains(&aligned.weekday()) {
                aligned = aligned.checked_add_signed(Duration::days(1))?;
                checked += 1;
                if checked > 7 {
                    return None;
                }
            }
        }

        Some(aligned)
    }

    /// 固定长度周期的步长，月和年没有固定长度
    fn fixed_step(&self) -> Option<Duration> {
        let every = i64::from(self.interval.every);
        match self.interval.period {
            IntervalPeriod::Minute => Duration::try_minutes(every),
            IntervalPeriod::Hour => Duration::try_hours(every),
            IntervalPeriod::Day => Duration::try_days(every),
            IntervalPeriod::Week => Duration::try_weeks(every),
            _ => None,
        }
    }

    /// 固定长度的周期可以直接跳过整段已错过的时间
    fn fast_forward(&self, base: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.interval.days.is_empty() || base >= now {
            return Some(base);
        }
        let Some(step) = self.fixed_step() else {
            return Some(base);
        };

        let skipped = (now - base).num_seconds() / step.num_seconds();
        if skipped <= 1 {
            return Some(base);
        }
        let jump = step.checked_mul(i32::try_from(skipped - 1).ok()?)?;
        self.align(base.checked_add_signed(jump)?)
    }

    fn uses_weekdays(&self) -> bool {
        matches!(
            self.interval.period,
            IntervalPeriod::Day | IntervalPeriod::Week
        )
    }
}
