use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use webfarm_core::{
    models::{WebFarmTask, WebFarmTaskType},
    traits::{CacheStore, FileStore, WebFarmTaskHandler},
    SchedulerError, SchedulerResult,
};

/// 头像文件所在的存储子目录
pub const AVATAR_DIRECTORY: &str = "avatars";

/// 头像任务参数：`[guid, file_name, extension]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarPayload {
    pub guid: String,
    pub file_name: String,
    pub extension: String,
}

impl AvatarPayload {
    pub const PARAMETER_COUNT: usize = 3;

    pub fn new(
        guid: impl Into<String>,
        file_name: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            guid: guid.into(),
            file_name: file_name.into(),
            extension: extension.into(),
        }
    }

    pub fn from_task(task: &WebFarmTask) -> SchedulerResult<Self> {
        let params = task.expect_parameter_count(Self::PARAMETER_COUNT)?;
        let payload = Self::new(params[0].trim(), params[1].trim(), params[2].trim());

        if payload.guid.is_empty() || payload.file_name.is_empty() {
            return Err(SchedulerError::InvalidTaskParams(format!(
                "任务 {} 的头像标识和文件名不能为空",
                task.task_type
            )));
        }
        if payload.file_name.contains(['/', '\\']) || payload.extension.contains(['/', '\\']) {
            return Err(SchedulerError::InvalidTaskParams(format!(
                "任务 {} 的头像文件名不能包含路径分隔符",
                task.task_type
            )));
        }
        Ok(payload)
    }

    /// 构造携带本参数的任务
    pub fn into_task(self, task_type: WebFarmTaskType, target: impl Into<String>) -> WebFarmTask {
        WebFarmTask::new(task_type, target).with_parameters([
            self.guid,
            self.file_name,
            self.extension,
        ])
    }

    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(AVATAR_DIRECTORY).join(format!("{}{}", self.file_name, self.extension))
    }

    pub fn cache_key(&self) -> String {
        format!("avatarfile|{}", self.guid)
    }
}

/// UPDATEAVATAR：写入头像文件并使缓存失效
///
/// 没有二进制数据时只触碰缓存键，文件由共享存储或后续请求提供。
pub struct UpdateAvatarHandler {
    files: Arc<dyn FileStore>,
    cache: Arc<dyn CacheStore>,
}

impl UpdateAvatarHandler {
    pub fn new(files: Arc<dyn FileStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self { files, cache }
    }
}

#[async_trait]
impl WebFarmTaskHandler for UpdateAvatarHandler {
    async fn execute(&self, task: &WebFarmTask) -> SchedulerResult<()> {
        let payload = AvatarPayload::from_task(task)?;

        if let Some(data) = &task.binary_data {
            self.files.write_file(&payload.relative_path(), data).await?;
            debug!("更新头像文件 {}", payload.relative_path().display());
        }

        self.cache.touch_key(&payload.cache_key());
        Ok(())
    }
}

/// DELETEAVATAR：删除头像文件并使缓存失效，文件不存在时视为成功
pub struct DeleteAvatarHandler {
    files: Arc<dyn FileStore>,
    cache: Arc<dyn CacheStore>,
}

impl DeleteAvatarHandler {
    pub fn new(files: Arc<dyn FileStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self { files, cache }
    }
}

#[async_trait]
impl WebFarmTaskHandler for DeleteAvatarHandler {
    async fn execute(&self, task: &WebFarmTask) -> SchedulerResult<()> {
        let payload = AvatarPayload::from_task(task)?;

        let deleted = self.files.delete_file(&payload.relative_path()).await?;
        if !deleted {
            debug!("头像文件 {} 已不存在", payload.relative_path().display());
        }

        self.cache.touch_key(&payload.cache_key());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_task() {
        let task = AvatarPayload::new("6f1c", "user", ".png")
            .into_task(WebFarmTaskType::UpdateAvatar, "node-a");
        let payload = AvatarPayload::from_task(&task).unwrap();
        assert_eq!(payload.relative_path(), PathBuf::from("avatars/user.png"));
        assert_eq!(payload.cache_key(), "avatarfile|6f1c");
    }

    #[test]
    fn test_payload_rejects_missing_parameter() {
        let task = WebFarmTask::new(WebFarmTaskType::DeleteAvatar, "node-a")
            .with_parameters(["6f1c", "user"]);
        let err = AvatarPayload::from_task(&task).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidTaskArguments {
                expected: 3,
                actual: 2,
                ..
            }
        ));
        assert!(err.to_string().contains("DELETEAVATAR"));
    }

    #[test]
    fn test_payload_rejects_path_separators() {
        let task = WebFarmTask::new(WebFarmTaskType::UpdateAvatar, "node-a")
            .with_parameters(["6f1c", "../user", ".png"]);
        assert!(matches!(
            AvatarPayload::from_task(&task),
            Err(SchedulerError::InvalidTaskParams(_))
        ));
    }
}
