use thiserror::Error;

/// 调度器错误类型定义
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),

    #[error("任务未找到: {id}")]
    TaskNotFound { id: i64 },

    #[error("任务已存在: {name}")]
    TaskAlreadyExists { name: String },

    #[error("任务类型已注册: {task_type}")]
    TaskTypeAlreadyRegistered { task_type: String },

    #[error("任务类型未注册: {task_type}")]
    TaskTypeNotRegistered { task_type: String },

    #[error("无效的调度间隔: {value} - {message}")]
    InvalidInterval { value: String, message: String },

    #[error("任务 {task_type} 参数数量不匹配: 期望 {expected} 个, 实际 {actual} 个")]
    InvalidTaskArguments {
        task_type: String,
        expected: usize,
        actual: usize,
    },

    #[error("无效的任务参数: {0}")]
    InvalidTaskParams(String),

    #[error("任务正在运行: {id}")]
    TaskAlreadyRunning { id: i64 },

    #[error("Web农场传输错误: {0}")]
    Transport(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("任务执行错误: {0}")]
    TaskExecution(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for SchedulerError {
    fn from(err: config::ConfigError) -> Self {
        SchedulerError::Configuration(err.to_string())
    }
}

impl SchedulerError {
    /// 是否为参数校验类错误
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            SchedulerError::InvalidTaskArguments { .. } | SchedulerError::InvalidTaskParams(_)
        )
    }
}

/// 统一的Result类型
pub type Result<T> = std::result::Result<T, SchedulerError>;
