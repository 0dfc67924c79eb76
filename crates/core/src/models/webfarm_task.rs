use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{SchedulerError, SchedulerResult};

/// Web农场任务类型
///
/// 任务类型字符串是创建节点与所有消费节点之间的线路协议。
/// 内置类型是封闭的枚举，模块自定义类型使用 `Custom`。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WebFarmTaskType {
    UpdateAvatar,
    DeleteAvatar,
    ResetDebugSettings,
    TouchCacheKeys,
    ClearCache,
    Custom(String),
}

impl WebFarmTaskType {
    pub fn as_str(&self) -> &str {
        match self {
            WebFarmTaskType::UpdateAvatar => "UPDATEAVATAR",
            WebFarmTaskType::DeleteAvatar => "DELETEAVATAR",
            WebFarmTaskType::ResetDebugSettings => "RESETDEBUGSETTINGS",
            WebFarmTaskType::TouchCacheKeys => "TOUCHCACHEKEYS",
            WebFarmTaskType::ClearCache => "CLEARCACHE",
            WebFarmTaskType::Custom(name) => name,
        }
    }

    /// 自定义类型名称统一为大写
    pub fn custom(name: &str) -> Self {
        match Self::from_wire(name) {
            WebFarmTaskType::Custom(_) => WebFarmTaskType::Custom(name.trim().to_ascii_uppercase()),
            builtin => builtin,
        }
    }

    /// 从线路字符串解析，未知名称归入 `Custom`
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "UPDATEAVATAR" => WebFarmTaskType::UpdateAvatar,
            "DELETEAVATAR" => WebFarmTaskType::DeleteAvatar,
            "RESETDEBUGSETTINGS" => WebFarmTaskType::ResetDebugSettings,
            "TOUCHCACHEKEYS" => WebFarmTaskType::TouchCacheKeys,
            "CLEARCACHE" => WebFarmTaskType::ClearCache,
            other => WebFarmTaskType::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for WebFarmTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebFarmTaskType {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(SchedulerError::InvalidTaskParams(
                "任务类型不能为空".to_string(),
            ));
        }
        Ok(Self::from_wire(s))
    }
}

impl Serialize for WebFarmTaskType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WebFarmTaskType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Web农场任务
///
/// 节点本地状态变化（缓存失效、文件写入）时创建的一次性广播消息，
/// 由其他所有节点消费后丢弃。参数按位置排列，顺序有意义。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebFarmTask {
    pub id: Uuid,
    pub task_type: WebFarmTaskType,
    pub target: String,
    pub parameters: Vec<String>,
    pub binary_data: Option<Vec<u8>>,
    /// 仅内存任务：进程重启后可以直接丢弃
    pub is_memory_task: bool,
    pub creator: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WebFarmTask {
    pub fn new(task_type: WebFarmTaskType, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type,
            target: target.into(),
            parameters: Vec::new(),
            binary_data: None,
            is_memory_task: false,
            creator: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_binary_data(mut self, data: Vec<u8>) -> Self {
        self.binary_data = Some(data);
        self
    }

    /// 校验位置参数个数，不匹配时返回参数错误
    pub fn expect_parameter_count(&self, expected: usize) -> SchedulerResult<&[String]> {
        if self.parameters.len() != expected {
            return Err(SchedulerError::InvalidTaskArguments {
                task_type: self.task_type.to_string(),
                expected,
                actual: self.parameters.len(),
            });
        }
        Ok(&self.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_wire_names() {
        assert_eq!(WebFarmTaskType::from_wire("updateavatar"), WebFarmTaskType::UpdateAvatar);
        assert_eq!(WebFarmTaskType::DeleteAvatar.to_string(), "DELETEAVATAR");
        assert_eq!(
            WebFarmTaskType::custom("reindexSite"),
            WebFarmTaskType::Custom("REINDEXSITE".to_string())
        );
        assert_eq!(WebFarmTaskType::custom("clearcache"), WebFarmTaskType::ClearCache);
        assert!("  ".parse::<WebFarmTaskType>().is_err());
    }

    #[test]
    fn test_expect_parameter_count() {
        let task = WebFarmTask::new(WebFarmTaskType::DeleteAvatar, "avatar")
            .with_parameters(["guid", "file"]);

        let err = task.expect_parameter_count(3).unwrap_err();
        match err {
            SchedulerError::InvalidTaskArguments {
                expected, actual, ..
            } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(task.expect_parameter_count(2).unwrap().len(), 2);
    }

    #[test]
    fn test_task_serializes_type_as_string() {
        let task = WebFarmTask::new(WebFarmTaskType::ClearCache, "cache");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["task_type"], "CLEARCACHE");
    }
}
