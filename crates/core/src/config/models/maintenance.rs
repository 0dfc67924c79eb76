use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// 非高峰时段配置，格式 HH:MM:SS，可跨越午夜
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffPeakConfig {
    pub start: String,
    pub end: String,
}

impl Default for OffPeakConfig {
    fn default() -> Self {
        Self {
            start: "22:00:00".to_string(),
            end: "06:00:00".to_string(),
        }
    }
}

impl OffPeakConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let (start, end) = self.window()?;
        if start == end {
            return Err(anyhow::anyhow!("非高峰时段的开始和结束时间不能相同"));
        }
        Ok(())
    }

    pub fn window(&self) -> anyhow::Result<(NaiveTime, NaiveTime)> {
        let parse = |value: &str| {
            NaiveTime::parse_from_str(value, "%H:%M:%S")
                .map_err(|e| anyhow::anyhow!("无效的非高峰时刻 {value}: {e}"))
        };
        Ok((parse(&self.start)?, parse(&self.end)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactCleanupConfig {
    /// 超过多少天没有活动的联系人被视为不活跃
    pub inactive_days: i64,
    pub batch_size: u64,
    /// 还有剩余批次时的重试间隔（秒）
    pub continue_after_seconds: i64,
}

impl Default for ContactCleanupConfig {
    fn default() -> Self {
        Self {
            inactive_days: 365,
            batch_size: 1000,
            continue_after_seconds: 60,
        }
    }
}

impl ContactCleanupConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.inactive_days <= 0 {
            return Err(anyhow::anyhow!("不活跃天数必须大于0"));
        }
        if self.batch_size == 0 {
            return Err(anyhow::anyhow!("删除批量必须大于0"));
        }
        if self.continue_after_seconds <= 0 {
            return Err(anyhow::anyhow!("批次间隔必须大于0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 本地文件存储根目录
    pub root_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: "data/files".to_string(),
        }
    }
}

/// 调试开关的默认值，重置调试设置时恢复为这些值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    pub debug_sql: bool,
    pub debug_cache: bool,
    pub debug_requests: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LicenseConfig {
    /// 已授权的功能名称
    pub features: Vec<String>,
}
