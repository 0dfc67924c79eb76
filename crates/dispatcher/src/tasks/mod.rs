//! 内置定时任务处理器

pub mod cleanup_webfarm_tasks;
pub mod delete_inactive_contacts;
pub mod disable_debug;

pub use cleanup_webfarm_tasks::CleanupWebFarmTasksTask;
pub use delete_inactive_contacts::{
    DeleteInactiveContactsTask, CONTACT_MANAGEMENT_FEATURE, INSUFFICIENT_LICENSE_MESSAGE,
};
pub use disable_debug::DisableDebugTask;
