use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaskInterval;

/// 定时任务定义
///
/// 表示任务表中的一行周期性工作，由管理员或模块安装程序创建，
/// 每次执行后由调度器推进下一次执行时间。
///
/// # 字段说明
///
/// - `id`: 任务的唯一标识符
/// - `name`: 任务代码名称，唯一
/// - `display_name`: 人类可读名称
/// - `task_type`: 处理器类型，用于在注册表中查找处理器
/// - `target`: 目标站点或对象引用
/// - `data`: 传给处理器的自由文本数据
/// - `enabled`: 是否启用
/// - `next_run_time`: 下一次执行时间，None 表示不再到期
/// - `interval`: 编码后的调度间隔
/// - `last_result`: 最近一次执行结果消息
/// - `server_name`: 仅允许在指定服务器上执行
/// - `status`: 运行状态（IDLE/RUNNING）
/// - `lease_owner`/`lease_expires_at`: 执行租约，保证同一任务不会并发执行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub task_type: String,
    pub target: Option<String>,
    pub data: Option<String>,
    pub enabled: bool,
    pub next_run_time: Option<DateTime<Utc>>,
    pub interval: TaskInterval,
    pub last_result: Option<String>,
    pub last_run_time: Option<DateTime<Utc>>,
    pub execution_count: i64,
    pub server_name: Option<String>,
    pub status: ScheduledTaskStatus,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 定时任务运行状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScheduledTaskStatus {
    #[serde(rename = "IDLE")]
    Idle,
    #[serde(rename = "RUNNING")]
    Running,
}

impl ScheduledTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduledTaskStatus::Idle => "IDLE",
            ScheduledTaskStatus::Running => "RUNNING",
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for ScheduledTaskStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for ScheduledTaskStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        match s {
            "IDLE" => Ok(ScheduledTaskStatus::Idle),
            "RUNNING" => Ok(ScheduledTaskStatus::Running),
            _ => Err(format!("Invalid scheduled task status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for ScheduledTaskStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

/// 定时任务过滤器
#[derive(Debug, Clone, Default)]
pub struct ScheduledTaskFilter {
    pub enabled: Option<bool>,
    pub task_type: Option<String>,
    pub name_pattern: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 一次执行完成后写回任务行的内容
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTaskRunUpdate {
    pub next_run_time: Option<DateTime<Utc>>,
    pub last_result: Option<String>,
    pub last_run_time: DateTime<Utc>,
    /// 致命错误时禁用任务
    pub disable: bool,
}

impl ScheduledTask {
    /// 创建新任务，首次执行时间为间隔的起始时间
    pub fn new(name: String, task_type: String, interval: TaskInterval) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // 将由数据库生成
            display_name: name.clone(),
            name,
            task_type,
            target: None,
            data: None,
            enabled: true,
            next_run_time: Some(interval.start_time),
            interval,
            last_result: None,
            last_run_time: None,
            execution_count: 0,
            server_name: None,
            status: ScheduledTaskStatus::Idle,
            lease_owner: None,
            lease_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 任务在给定时刻是否到期
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run_time.is_some_and(|next| next <= now)
    }

    /// 任务是否允许在指定服务器上执行
    pub fn runs_on(&self, server_name: &str) -> bool {
        match &self.server_name {
            Some(name) => name.eq_ignore_ascii_case(server_name),
            None => true,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, ScheduledTaskStatus::Running)
    }

    /// 租约是否已过期（进程崩溃后遗留的运行状态）
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.lease_expires_at.is_none_or(|expires| expires <= now)
    }
}
