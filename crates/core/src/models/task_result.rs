use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 定时任务执行结果
///
/// 区分成功、可恢复错误（任务继续按计划执行）和致命错误（任务被禁用），
/// 而不是把所有失败折叠成一条字符串。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum TaskResult {
    Success(Option<String>),
    Error(String),
    Fatal(String),
}

impl TaskResult {
    pub fn success() -> Self {
        TaskResult::Success(None)
    }

    pub fn success_with_message(message: impl Into<String>) -> Self {
        TaskResult::Success(Some(message.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        TaskResult::Error(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        TaskResult::Fatal(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, TaskResult::Fatal(_))
    }

    /// 写入任务行 `last_result` 的消息
    pub fn message(&self) -> Option<&str> {
        match self {
            TaskResult::Success(message) => message.as_deref(),
            TaskResult::Error(message) | TaskResult::Fatal(message) => Some(message),
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            TaskResult::Success(_) => "success",
            TaskResult::Error(_) => "error",
            TaskResult::Fatal(_) => "fatal",
        }
    }
}

/// 处理器返回给调度器的完整结果
///
/// `reschedule_at` 允许批处理任务自行决定下一次执行时间，
/// 为 None 时由调度间隔推导。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub result: TaskResult,
    pub reschedule_at: Option<DateTime<Utc>>,
}

impl TaskOutcome {
    pub fn new(result: TaskResult) -> Self {
        Self {
            result,
            reschedule_at: None,
        }
    }

    pub fn success() -> Self {
        Self::new(TaskResult::success())
    }

    pub fn reschedule_at(mut self, at: DateTime<Utc>) -> Self {
        self.reschedule_at = Some(at);
        self
    }
}

impl From<TaskResult> for TaskOutcome {
    fn from(result: TaskResult) -> Self {
        Self::new(result)
    }
}
