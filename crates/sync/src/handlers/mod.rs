//! 内置Web农场任务处理器

pub mod avatar;
pub mod cache;
pub mod debug;

use std::sync::Arc;

use webfarm_core::{
    models::{WebFarmTask, WebFarmTaskType},
    traits::{CacheStore, FileStore},
    SchedulerResult,
};

pub use avatar::{AvatarPayload, DeleteAvatarHandler, UpdateAvatarHandler, AVATAR_DIRECTORY};
pub use cache::{ClearCacheHandler, TouchCacheKeysHandler, TouchCacheKeysPayload};
pub use debug::ResetDebugSettingsHandler;

use crate::registry::{TaskCondition, WebFarmTaskRegistry};
use crate::settings::{DebugSettings, SynchronizationSettings};

/// 内置处理器依赖的本地资源
#[derive(Clone)]
pub struct BuiltinDependencies {
    pub files: Arc<dyn FileStore>,
    pub cache: Arc<dyn CacheStore>,
    pub debug: Arc<DebugSettings>,
    pub sync: Arc<SynchronizationSettings>,
}

/// 注册全部内置任务类型
pub fn register_builtin_tasks(
    registry: &mut WebFarmTaskRegistry,
    deps: &BuiltinDependencies,
) -> SchedulerResult<()> {
    let sync = deps.sync.clone();
    let avatars_enabled: TaskCondition = Arc::new(move |_: &WebFarmTask| sync.synchronize_avatars());
    let sync = deps.sync.clone();
    let cache_enabled: TaskCondition = Arc::new(move |_: &WebFarmTask| sync.synchronize_cache());

    registry.register_task(
        WebFarmTaskType::UpdateAvatar,
        Arc::new(UpdateAvatarHandler::new(deps.files.clone(), deps.cache.clone())),
        Some(avatars_enabled.clone()),
        false,
    )?;
    registry.register_task(
        WebFarmTaskType::DeleteAvatar,
        Arc::new(DeleteAvatarHandler::new(deps.files.clone(), deps.cache.clone())),
        Some(avatars_enabled),
        false,
    )?;
    registry.register_task(
        WebFarmTaskType::ResetDebugSettings,
        Arc::new(ResetDebugSettingsHandler::new(deps.debug.clone())),
        None,
        false,
    )?;
    registry.register_task(
        WebFarmTaskType::TouchCacheKeys,
        Arc::new(TouchCacheKeysHandler::new(deps.cache.clone())),
        Some(cache_enabled),
        true,
    )?;
    registry.register_task(
        WebFarmTaskType::ClearCache,
        Arc::new(ClearCacheHandler::new(deps.cache.clone())),
        None,
        true,
    )?;
    Ok(())
}
