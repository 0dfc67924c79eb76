use serde::{Deserialize, Serialize};

/// Web农场任务传输方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// 数据库队列，节点间共享
    Database,
    /// 进程内通道，单进程或测试使用
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebFarmConfig {
    /// 是否参与Web农场同步
    pub enabled: bool,
    /// 本节点的服务器名称，为空时使用主机名
    pub server_name: String,
    pub transport: TransportType,
    pub poll_interval_seconds: u64,
    pub fetch_batch_size: usize,
    /// 静态登记的服务器名称
    pub servers: Vec<String>,
    pub synchronize_avatars: bool,
    pub synchronize_cache: bool,
    /// 已处理任务的保留时长（小时）
    pub task_retention_hours: i64,
}

impl Default for WebFarmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            server_name: String::new(),
            transport: TransportType::Database,
            poll_interval_seconds: 5,
            fetch_batch_size: 100,
            servers: Vec::new(),
            synchronize_avatars: true,
            synchronize_cache: true,
            task_retention_hours: 24,
        }
    }
}

impl WebFarmConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_seconds == 0 {
            return Err(anyhow::anyhow!("任务轮询间隔必须大于0"));
        }

        if self.fetch_batch_size == 0 {
            return Err(anyhow::anyhow!("任务拉取批量必须大于0"));
        }

        if self.task_retention_hours <= 0 {
            return Err(anyhow::anyhow!("任务保留时长必须大于0"));
        }

        if self.servers.iter().any(|s| s.trim().is_empty()) {
            return Err(anyhow::anyhow!("服务器名称不能为空"));
        }

        Ok(())
    }

    /// 解析本节点的服务器名称，未配置时回退到主机名
    pub fn resolve_server_name(&self) -> String {
        if !self.server_name.trim().is_empty() {
            return self.server_name.trim().to_string();
        }
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    }
}
