use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    api_observability::{ApiConfig, ObservabilityConfig},
    database::DatabaseConfig,
    maintenance::{ContactCleanupConfig, DebugConfig, LicenseConfig, OffPeakConfig, StorageConfig},
    scheduler::SchedulerConfig,
    web_farm::WebFarmConfig,
};

/// 环境变量前缀，例如 `WEBFARM__SCHEDULER__INTERVAL_SECONDS=30`
pub const ENV_PREFIX: &str = "WEBFARM";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub web_farm: WebFarmConfig,
    pub off_peak: OffPeakConfig,
    pub contacts: ContactCleanupConfig,
    pub storage: StorageConfig,
    pub debug: DebugConfig,
    pub license: LicenseConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 加载配置：代码默认值 < 配置文件 < 环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&AppConfig::default()).context("序列化默认配置失败")?);

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/webfarm.toml", "webfarm.toml", "/etc/webfarm/config.toml"];
            if let Some(path) = default_paths.iter().find(|p| Path::new(p).exists()) {
                builder = builder.add_source(File::new(*path, FileFormat::Toml));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("web_farm.servers")
                .with_list_parse_key("license.features")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("解析配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// 从TOML字符串加载，缺失的字段使用默认值
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&AppConfig::default())?)
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.database.validate().context("数据库配置无效")?;
        self.scheduler.validate().context("调度器配置无效")?;
        self.web_farm.validate().context("Web农场配置无效")?;
        self.off_peak.validate().context("非高峰时段配置无效")?;
        self.contacts.validate().context("联系人清理配置无效")?;
        self.api.validate().context("API配置无效")?;
        self.observability.validate().context("可观测性配置无效")?;
        Ok(())
    }

    /// 生成默认配置文件内容
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&AppConfig::default()).context("生成默认配置失败")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportType;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.interval_seconds, 60);
        assert_eq!(config.web_farm.transport, TransportType::Database);
    }

    #[test]
    fn test_from_toml_overrides_sections() {
        let config = AppConfig::from_toml_str(
            r#"
            [scheduler]
            interval_seconds = 15

            [web_farm]
            server_name = "node-a"
            transport = "memory"
            servers = ["node-a", "node-b"]
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.interval_seconds, 15);
        assert_eq!(config.scheduler.lease_seconds, 1800);
        assert_eq!(config.web_farm.resolve_server_name(), "node-a");
        assert_eq!(config.web_farm.transport, TransportType::Memory);
        assert_eq!(config.web_farm.servers.len(), 2);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AppConfig::from_toml_str("[scheduler]\ninterval_seconds = 0").is_err());
        assert!(AppConfig::from_toml_str("[off_peak]\nstart = \"25:00:00\"").is_err());
        assert!(AppConfig::from_toml_str("[database]\nurl = \"mysql://localhost\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("webfarm.toml");
        std::fs::write(&path, "[contacts]\nbatch_size = 10\n").unwrap();

        let config = AppConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.contacts.batch_size, 10);
        assert!(AppConfig::load(Some("/nonexistent/webfarm.toml")).is_err());
    }

    #[test]
    fn test_default_toml_round_trips() {
        let content = AppConfig::default_toml().unwrap();
        let config = AppConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.api.bind_address, "0.0.0.0:8080");
    }
}
