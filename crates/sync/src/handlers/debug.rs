use std::sync::Arc;

use async_trait::async_trait;
use webfarm_core::{models::WebFarmTask, traits::WebFarmTaskHandler, SchedulerResult};

use crate::settings::DebugSettings;

/// RESETDEBUGSETTINGS：把本地调试开关恢复为默认值
pub struct ResetDebugSettingsHandler {
    debug: Arc<DebugSettings>,
}

impl ResetDebugSettingsHandler {
    pub fn new(debug: Arc<DebugSettings>) -> Self {
        Self { debug }
    }
}

#[async_trait]
impl WebFarmTaskHandler for ResetDebugSettingsHandler {
    async fn execute(&self, task: &WebFarmTask) -> SchedulerResult<()> {
        task.expect_parameter_count(0)?;
        self.debug.reset();
        Ok(())
    }
}
