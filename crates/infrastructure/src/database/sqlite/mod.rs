pub mod sqlite_contact_store;
pub mod sqlite_scheduled_task_repository;
pub mod sqlite_webfarm_transport;

pub use sqlite_contact_store::SqliteContactStore;
pub use sqlite_scheduled_task_repository::SqliteScheduledTaskRepository;
pub use sqlite_webfarm_transport::SqliteWebFarmTransport;
