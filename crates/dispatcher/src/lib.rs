//! 定时任务调度
//!
//! 扫描任务表中的到期任务，取得租约后调用已注册的处理器，
//! 再按调度间隔或处理器给出的时间写回下一次执行时间。

pub mod counters;
pub mod interval_utils;
pub mod recovery_service;
pub mod registry;
pub mod scheduler;
pub mod tasks;

pub use counters::{CountersSnapshot, PerformanceCounters, RunningTaskGuard};
pub use interval_utils::IntervalScheduler;
pub use recovery_service::{RecoveryReport, SchedulerRecoveryService};
pub use registry::ScheduledTaskRegistry;
pub use scheduler::{SchedulerPassReport, SchedulerSettings, TaskRunRecord, TaskScheduler};
