//! Web农场任务同步
//!
//! 一个节点的本地状态变化（缓存失效、头像文件写入）以任务形式广播，
//! 其他节点按任务类型找到处理器在本地重放。

pub mod handlers;
pub mod registry;
pub mod service;
pub mod settings;

pub use handlers::{register_builtin_tasks, BuiltinDependencies};
pub use registry::{TaskCondition, TaskTypeRegistration, WebFarmTaskRegistry};
pub use service::{ProcessReport, WebFarmService, WebFarmSettings};
pub use settings::{DebugSettings, SynchronizationSettings};
