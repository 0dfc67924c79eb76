//! 仓储与协作者接口的内存Mock实现
//!
//! 单元测试使用，不需要数据库或外部服务。

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use webfarm_core::models::{
    ScheduledTask, ScheduledTaskFilter, ScheduledTaskRunUpdate, ScheduledTaskStatus, TaskOutcome,
    WebFarmTask,
};
use webfarm_core::traits::{
    CacheStore, ContactStore, FileStore, LicenseService, OffPeakService, ScheduledTaskContext,
    ScheduledTaskHandler, ScheduledTaskRepository, WebFarmTaskHandler,
};
use webfarm_core::{SchedulerError, SchedulerResult};

/// ScheduledTaskRepository 的Mock实现，租约语义与数据库实现一致
#[derive(Debug, Clone)]
pub struct MockScheduledTaskRepository {
    tasks: Arc<Mutex<HashMap<i64, ScheduledTask>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MockScheduledTaskRepository {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    pub fn with_tasks(tasks: Vec<ScheduledTask>) -> Self {
        let repo = Self::new();
        let mut max_id = 0;
        {
            let mut map = repo.tasks.lock().unwrap();
            for task in tasks {
                max_id = max_id.max(task.id);
                map.insert(task.id, task);
            }
        }
        *repo.next_id.lock().unwrap() = max_id + 1;
        repo
    }

    pub fn count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn get(&self, id: i64) -> Option<ScheduledTask> {
        self.tasks.lock().unwrap().get(&id).cloned()
    }

    pub fn get_all_tasks(&self) -> Vec<ScheduledTask> {
        let mut tasks: Vec<ScheduledTask> = self.tasks.lock().unwrap().values().cloned().collect();
        tasks.sort_by_key(|t| t.id);
        tasks
    }

    /// 直接修改任务，模拟其他节点的写入
    pub fn modify<F: FnOnce(&mut ScheduledTask)>(&self, id: i64, f: F) {
        if let Some(task) = self.tasks.lock().unwrap().get_mut(&id) {
            f(task);
        }
    }

    fn lease_free(task: &ScheduledTask, now: DateTime<Utc>) -> bool {
        task.status == ScheduledTaskStatus::Idle || task.lease_expired(now)
    }
}

impl Default for MockScheduledTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduledTaskRepository for MockScheduledTaskRepository {
    async fn create(&self, task: &ScheduledTask) -> SchedulerResult<ScheduledTask> {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.values().any(|t| t.name == task.name) {
            return Err(SchedulerError::TaskAlreadyExists {
                name: task.name.clone(),
            });
        }
        let mut next_id = self.next_id.lock().unwrap();
        let mut created = task.clone();
        created.id = *next_id;
        created.status = ScheduledTaskStatus::Idle;
        *next_id += 1;
        tasks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<ScheduledTask>> {
        Ok(self.tasks.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> SchedulerResult<Option<ScheduledTask>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn update(&self, task: &ScheduledTask) -> SchedulerResult<()> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get_mut(&task.id) {
            Some(existing) => {
                *existing = task.clone();
                existing.updated_at = Utc::now();
                Ok(())
            }
            None => Err(SchedulerError::TaskNotFound { id: task.id }),
        }
    }

    async fn delete(&self, id: i64) -> SchedulerResult<()> {
        self.tasks
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(SchedulerError::TaskNotFound { id })
    }

    async fn list(&self, filter: &ScheduledTaskFilter) -> SchedulerResult<Vec<ScheduledTask>> {
        let tasks = self.get_all_tasks();
        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(tasks
            .into_iter()
            .filter(|t| filter.enabled.is_none_or(|enabled| t.enabled == enabled))
            .filter(|t| filter.task_type.as_ref().is_none_or(|ty| &t.task_type == ty))
            .filter(|t| {
                filter
                    .name_pattern
                    .as_ref()
                    .is_none_or(|pattern| t.name.contains(pattern.as_str()))
            })
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn get_due_tasks(
        &self,
        now: DateTime<Utc>,
        server_name: &str,
        limit: i64,
    ) -> SchedulerResult<Vec<ScheduledTask>> {
        let mut due: Vec<ScheduledTask> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.is_due(now) && t.runs_on(server_name) && Self::lease_free(t, now))
            .cloned()
            .collect();
        due.sort_by_key(|t| t.next_run_time);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn count_due_tasks(&self, now: DateTime<Utc>) -> SchedulerResult<i64> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.is_due(now))
            .count() as i64)
    }

    async fn try_acquire_due(
        &self,
        id: i64,
        owner: &str,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> SchedulerResult<bool> {
        let due = self
            .tasks
            .lock()
            .unwrap()
            .get(&id)
            .is_some_and(|task| task.is_due(now));
        if !due {
            return Ok(false);
        }
        self.try_acquire(id, owner, now, lease_until).await
    }

    async fn try_acquire(
        &self,
        id: i64,
        owner: &str,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> SchedulerResult<bool> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(false);
        };
        if !Self::lease_free(task, now) {
            return Ok(false);
        }
        task.status = ScheduledTaskStatus::Running;
        task.lease_owner = Some(owner.to_string());
        task.lease_expires_at = Some(lease_until);
        Ok(true)
    }

    async fn complete_run(
        &self,
        id: i64,
        owner: &str,
        update: &ScheduledTaskRunUpdate,
    ) -> SchedulerResult<bool> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(false);
        };
        if task.lease_owner.as_deref() != Some(owner) {
            return Ok(false);
        }
        task.status = ScheduledTaskStatus::Idle;
        task.lease_owner = None;
        task.lease_expires_at = None;
        task.next_run_time = update.next_run_time;
        task.last_result = update.last_result.clone();
        task.last_run_time = Some(update.last_run_time);
        task.execution_count += 1;
        if update.disable {
            task.enabled = false;
        }
        Ok(true)
    }

    async fn reset_corrupted(&self, owner: &str, now: DateTime<Utc>) -> SchedulerResult<u64> {
        let mut reset = 0;
        for task in self.tasks.lock().unwrap().values_mut() {
            let orphaned = task.lease_owner.as_deref().is_none_or(|o| o == owner);
            if task.is_running() && (orphaned || task.lease_expired(now)) {
                task.status = ScheduledTaskStatus::Idle;
                task.lease_owner = None;
                task.lease_expires_at = None;
                reset += 1;
            }
        }
        Ok(reset)
    }
}

/// ContactStore 的Mock实现，只记录每个联系人的最后活动时间
#[derive(Debug, Clone, Default)]
pub struct MockContactStore {
    last_activity: Arc<Mutex<Vec<DateTime<Utc>>>>,
    delete_calls: Arc<AtomicUsize>,
}

impl MockContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contacts<I: IntoIterator<Item = DateTime<Utc>>>(last_activity: I) -> Self {
        let store = Self::new();
        store.last_activity.lock().unwrap().extend(last_activity);
        store
    }

    pub fn count(&self) -> usize {
        self.last_activity.lock().unwrap().len()
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactStore for MockContactStore {
    async fn count_inactive(&self, inactive_since: DateTime<Utc>) -> SchedulerResult<u64> {
        Ok(self
            .last_activity
            .lock()
            .unwrap()
            .iter()
            .filter(|at| **at < inactive_since)
            .count() as u64)
    }

    async fn delete_inactive(
        &self,
        inactive_since: DateTime<Utc>,
        batch_size: u64,
    ) -> SchedulerResult<u64> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut contacts = self.last_activity.lock().unwrap();
        let mut deleted = 0u64;
        contacts.retain(|at| {
            if deleted < batch_size && *at < inactive_since {
                deleted += 1;
                false
            } else {
                true
            }
        });
        Ok(deleted)
    }
}

/// 固定功能集合的许可证
#[derive(Debug, Clone, Default)]
pub struct MockLicenseService {
    features: HashSet<String>,
}

impl MockLicenseService {
    pub fn with_features<I: IntoIterator<Item = S>, S: Into<String>>(features: I) -> Self {
        Self {
            features: features.into_iter().map(Into::into).collect(),
        }
    }

    pub fn unlicensed() -> Self {
        Self::default()
    }
}

impl LicenseService for MockLicenseService {
    fn is_feature_available(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

/// 返回固定时间的非高峰时段服务
#[derive(Debug, Clone)]
pub struct MockOffPeakService {
    pub next_start: Option<DateTime<Utc>>,
}

impl MockOffPeakService {
    pub fn starting_at(next_start: DateTime<Utc>) -> Self {
        Self {
            next_start: Some(next_start),
        }
    }
}

impl OffPeakService for MockOffPeakService {
    fn next_off_peak_start(&self, _after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_start
    }
}

/// 记录所有操作的缓存
#[derive(Debug, Default)]
pub struct MockCacheStore {
    touched: Mutex<Vec<String>>,
    clears: AtomicUsize,
}

impl MockCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touched_keys(&self) -> Vec<String> {
        self.touched.lock().unwrap().clone()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl CacheStore for MockCacheStore {
    fn touch_key(&self, key: &str) {
        self.touched.lock().unwrap().push(key.to_string());
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// 内存文件存储
#[derive(Debug, Default)]
pub struct MockFileStore {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MockFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files.lock().unwrap().insert(path.into(), data);
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FileStore for MockFileStore {
    async fn write_file(&self, relative_path: &Path, data: &[u8]) -> SchedulerResult<()> {
        self.insert(relative_path, data.to_vec());
        Ok(())
    }

    async fn delete_file(&self, relative_path: &Path) -> SchedulerResult<bool> {
        Ok(self.files.lock().unwrap().remove(relative_path).is_some())
    }

    async fn exists(&self, relative_path: &Path) -> SchedulerResult<bool> {
        Ok(self.files.lock().unwrap().contains_key(relative_path))
    }
}

/// 定时任务处理器的预设行为
#[derive(Debug, Clone)]
pub enum HandlerBehavior {
    Return(TaskOutcome),
    Fail(String),
    Panic(String),
}

/// 按预设行为返回并记录调用次数的定时任务处理器
#[derive(Debug)]
pub struct RecordingScheduledHandler {
    behavior: HandlerBehavior,
    calls: AtomicUsize,
    contexts: Mutex<Vec<ScheduledTaskContext>>,
}

impl RecordingScheduledHandler {
    pub fn new(behavior: HandlerBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(HandlerBehavior::Return(TaskOutcome::success()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<ScheduledTaskContext> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScheduledTaskHandler for RecordingScheduledHandler {
    async fn execute(&self, context: &ScheduledTaskContext) -> SchedulerResult<TaskOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(context.clone());
        match &self.behavior {
            HandlerBehavior::Return(outcome) => Ok(outcome.clone()),
            HandlerBehavior::Fail(message) => Err(SchedulerError::TaskExecution(message.clone())),
            HandlerBehavior::Panic(message) => panic!("{}", message),
        }
    }
}

/// 记录收到的任务的Web农场处理器
#[derive(Debug, Default)]
pub struct RecordingWebFarmHandler {
    tasks: Mutex<Vec<WebFarmTask>>,
    fail_with: Option<String>,
}

impl RecordingWebFarmHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    pub fn received(&self) -> Vec<WebFarmTask> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebFarmTaskHandler for RecordingWebFarmHandler {
    async fn execute(&self, task: &WebFarmTask) -> SchedulerResult<()> {
        self.tasks.lock().unwrap().push(task.clone());
        match &self.fail_with {
            Some(message) => Err(SchedulerError::TaskExecution(message.clone())),
            None => Ok(()),
        }
    }
}
