pub mod cache;
pub mod database;
pub mod in_memory_transport;
pub mod license;
pub mod observability;
pub mod off_peak;
pub mod storage;
pub mod transport_factory;

pub use cache::MemoryCacheStore;
pub use database::*;
pub use in_memory_transport::{InMemoryTransportConfig, InMemoryWebFarmTransport};
pub use license::ConfiguredLicenseService;
pub use observability::*;
pub use off_peak::ConfiguredOffPeakWindow;
pub use storage::LocalFileStore;
pub use transport_factory::WebFarmTransportFactory;
