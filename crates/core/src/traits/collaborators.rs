//! 外部协作者接口
//!
//! 联系人存储、许可证、文件存储、缓存和非高峰时段都由系统的其他部分提供，
//! 这里只定义内置处理器需要调用的最小接口。

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::SchedulerResult;

/// 非高峰时段服务
pub trait OffPeakService: Send + Sync {
    /// 严格晚于 `after` 的下一个非高峰窗口开始时间
    fn next_off_peak_start(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// 联系人存储
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// 最后活动时间早于 `inactive_since` 的联系人数量
    async fn count_inactive(&self, inactive_since: DateTime<Utc>) -> SchedulerResult<u64>;

    /// 删除至多 `batch_size` 个不活跃联系人，返回实际删除数量
    async fn delete_inactive(
        &self,
        inactive_since: DateTime<Utc>,
        batch_size: u64,
    ) -> SchedulerResult<u64>;
}

/// 许可证检查
pub trait LicenseService: Send + Sync {
    fn is_feature_available(&self, feature: &str) -> bool;
}

/// 文件存储
#[async_trait]
pub trait FileStore: Send + Sync {
    /// 写入文件，相对路径，已存在则覆盖
    async fn write_file(&self, relative_path: &Path, data: &[u8]) -> SchedulerResult<()>;

    /// 删除文件，文件不存在时返回 false
    async fn delete_file(&self, relative_path: &Path) -> SchedulerResult<bool>;

    async fn exists(&self, relative_path: &Path) -> SchedulerResult<bool>;
}

/// 本地缓存
pub trait CacheStore: Send + Sync {
    /// 触碰缓存依赖键，使依赖它的缓存项失效
    fn touch_key(&self, key: &str);

    /// 清空全部缓存
    fn clear(&self);
}
