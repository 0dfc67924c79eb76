//! 测试工具：Mock实现和测试数据构建器

pub mod builders;
pub mod mocks;

pub use builders::ScheduledTaskBuilder;
pub use mocks::{
    HandlerBehavior, MockCacheStore, MockContactStore, MockFileStore, MockLicenseService,
    MockOffPeakService, MockScheduledTaskRepository, RecordingScheduledHandler,
    RecordingWebFarmHandler,
};
