use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use webfarm_core::{
    config::ContactCleanupConfig,
    models::{TaskOutcome, TaskResult},
    traits::{ContactStore, LicenseService, OffPeakService, ScheduledTaskContext, ScheduledTaskHandler},
    SchedulerResult,
};

/// 联系人管理功能的许可证名称
pub const CONTACT_MANAGEMENT_FEATURE: &str = "ContactManagement";

/// 许可证不足时写入任务结果的消息
pub const INSUFFICIENT_LICENSE_MESSAGE: &str = "当前许可证不包含联系人管理功能，无法删除不活跃联系人";

/// 删除不活跃联系人
///
/// 每次执行只删除一批。还有剩余时在短间隔后再次执行，
/// 全部删除完毕后推迟到下一个非高峰窗口开始。
pub struct DeleteInactiveContactsTask {
    contacts: Arc<dyn ContactStore>,
    license: Arc<dyn LicenseService>,
    off_peak: Arc<dyn OffPeakService>,
    settings: ContactCleanupConfig,
}

impl DeleteInactiveContactsTask {
    pub const TASK_TYPE: &'static str = "DeleteInactiveContacts";

    pub fn new(
        contacts: Arc<dyn ContactStore>,
        license: Arc<dyn LicenseService>,
        off_peak: Arc<dyn OffPeakService>,
        settings: ContactCleanupConfig,
    ) -> Self {
        Self {
            contacts,
            license,
            off_peak,
            settings,
        }
    }

    fn at_next_off_peak(&self, outcome: TaskOutcome, now: DateTime<Utc>) -> TaskOutcome {
        match self.off_peak.next_off_peak_start(now) {
            Some(at) => outcome.reschedule_at(at),
            None => outcome,
        }
    }
}

#[async_trait]
impl ScheduledTaskHandler for DeleteInactiveContactsTask {
    async fn execute(&self, context: &ScheduledTaskContext) -> SchedulerResult<TaskOutcome> {
        if !self.license.is_feature_available(CONTACT_MANAGEMENT_FEATURE) {
            warn!("任务 {}: {}", context.task.name, INSUFFICIENT_LICENSE_MESSAGE);
            return Ok(TaskResult::error(INSUFFICIENT_LICENSE_MESSAGE).into());
        }

        let now = Utc::now();
        let inactive_since = now - Duration::days(self.settings.inactive_days);
        let eligible = self.contacts.count_inactive(inactive_since).await?;

        if eligible == 0 {
            debug!("没有需要删除的不活跃联系人");
            return Ok(self.at_next_off_peak(TaskOutcome::success(), now));
        }

        let batch_size = self.settings.batch_size;
        let deleted = self.contacts.delete_inactive(inactive_since, batch_size).await?;
        info!(
            "删除了 {} 个不活跃联系人 (符合条件 {} 个, 批量 {})",
            deleted, eligible, batch_size
        );

        let outcome = TaskOutcome::new(TaskResult::success_with_message(format!(
            "已删除 {deleted} 个不活跃联系人"
        )));
        if eligible > batch_size {
            let continue_at = now + Duration::seconds(self.settings.continue_after_seconds);
            Ok(outcome.reschedule_at(continue_at))
        } else {
            Ok(self.at_next_off_peak(outcome, now))
        }
    }

    fn description(&self) -> &str {
        "分批删除长期不活跃的联系人"
    }
}
