pub mod api_observability;
pub mod app_config;
pub mod database;
pub mod maintenance;
pub mod scheduler;
pub mod web_farm;

// Re-export main types for easier imports
pub use api_observability::{ApiConfig, ObservabilityConfig};
pub use app_config::AppConfig;
pub use database::DatabaseConfig;
pub use maintenance::{ContactCleanupConfig, DebugConfig, LicenseConfig, OffPeakConfig, StorageConfig};
pub use scheduler::SchedulerConfig;
pub use web_farm::{TransportType, WebFarmConfig};
