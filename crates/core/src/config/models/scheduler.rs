use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// 调度循环的触发间隔（秒）
    pub interval_seconds: u64,
    /// 执行租约时长（秒），超过后其他节点可以接管任务
    pub lease_seconds: i64,
    /// 每次扫描最多执行的到期任务数
    pub max_tasks_per_pass: i64,
    /// 启动时重置损坏的运行状态
    pub reinit_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
            lease_seconds: 1800,
            max_tasks_per_pass: 50,
            reinit_on_start: true,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_seconds == 0 {
            return Err(anyhow::anyhow!("调度间隔必须大于0"));
        }

        if self.lease_seconds <= 0 {
            return Err(anyhow::anyhow!("执行租约时长必须大于0"));
        }

        if self.max_tasks_per_pass <= 0 {
            return Err(anyhow::anyhow!("每次扫描的最大任务数必须大于0"));
        }

        Ok(())
    }
}
