//! 测试数据构建器

use chrono::{DateTime, Duration, TimeZone, Utc};
use webfarm_core::models::{IntervalPeriod, ScheduledTask, TaskInterval};

/// 定时任务构建器，默认是一个已到期的每小时任务
pub struct ScheduledTaskBuilder {
    task: ScheduledTask,
}

impl ScheduledTaskBuilder {
    pub fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut task = ScheduledTask::new(
            "test_task".to_string(),
            "TestTask".to_string(),
            TaskInterval::new(IntervalPeriod::Hour, 1, start),
        );
        task.id = 1;
        task.next_run_time = Some(Utc::now() - Duration::minutes(1));
        Self { task }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.task.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self.task.display_name = name.to_string();
        self
    }

    pub fn with_task_type(mut self, task_type: &str) -> Self {
        self.task.task_type = task_type.to_string();
        self
    }

    pub fn with_interval(mut self, interval: TaskInterval) -> Self {
        self.task.interval = interval;
        self
    }

    pub fn with_next_run_time(mut self, next_run_time: Option<DateTime<Utc>>) -> Self {
        self.task.next_run_time = next_run_time;
        self
    }

    pub fn with_data(mut self, data: &str) -> Self {
        self.task.data = Some(data.to_string());
        self
    }

    pub fn with_server_name(mut self, server_name: &str) -> Self {
        self.task.server_name = Some(server_name.to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.task.enabled = false;
        self
    }

    /// 未到期：下一次执行时间在一小时后
    pub fn not_due(mut self) -> Self {
        self.task.next_run_time = Some(Utc::now() + Duration::hours(1));
        self
    }

    pub fn build(self) -> ScheduledTask {
        self.task
    }
}

impl Default for ScheduledTaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}
