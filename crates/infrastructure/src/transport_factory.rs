use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, info};
use webfarm_core::{
    config::{TransportType, WebFarmConfig},
    traits::WebFarmTransport,
    SchedulerError, SchedulerResult,
};

use crate::{InMemoryWebFarmTransport, SqliteWebFarmTransport};

pub struct WebFarmTransportFactory;

impl WebFarmTransportFactory {
    /// 按配置创建传输，数据库传输需要连接池
    pub fn create(
        config: &WebFarmConfig,
        pool: Option<&SqlitePool>,
    ) -> SchedulerResult<Arc<dyn WebFarmTransport>> {
        debug!("创建Web农场传输，类型: {:?}", config.transport);

        match config.transport {
            TransportType::Database => {
                let pool = pool.ok_or_else(|| {
                    SchedulerError::Configuration("数据库传输需要数据库连接池".to_string())
                })?;
                info!("使用数据库Web农场传输");
                Ok(Arc::new(SqliteWebFarmTransport::new(pool.clone())))
            }
            TransportType::Memory => {
                info!("使用内存Web农场传输");
                Ok(Arc::new(InMemoryWebFarmTransport::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_transport_requires_pool() {
        let config = WebFarmConfig::default();
        assert!(matches!(
            WebFarmTransportFactory::create(&config, None),
            Err(SchedulerError::Configuration(_))
        ));
    }

    #[test]
    fn test_memory_transport() {
        let config = WebFarmConfig {
            transport: TransportType::Memory,
            ..Default::default()
        };
        assert!(WebFarmTransportFactory::create(&config, None).is_ok());
    }
}
