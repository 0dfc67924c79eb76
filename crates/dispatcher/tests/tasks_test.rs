use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use webfarm_core::config::{ContactCleanupConfig, DebugConfig};
use webfarm_core::models::{TaskResult, WebFarmTask, WebFarmTaskType};
use webfarm_core::traits::{ScheduledTaskContext, ScheduledTaskHandler, WebFarmTransport};
use webfarm_dispatcher::tasks::{
    CleanupWebFarmTasksTask, DeleteInactiveContactsTask, DisableDebugTask,
    CONTACT_MANAGEMENT_FEATURE, INSUFFICIENT_LICENSE_MESSAGE,
};
use webfarm_infrastructure::{InMemoryWebFarmTransport, MetricsCollector};
use webfarm_sync::{
    DebugSettings, SynchronizationSettings, WebFarmService, WebFarmSettings, WebFarmTaskRegistry,
};
use webfarm_testing_utils::{
    MockContactStore, MockLicenseService, MockOffPeakService, RecordingWebFarmHandler,
    ScheduledTaskBuilder,
};

fn context() -> ScheduledTaskContext {
    ScheduledTaskContext {
        task: ScheduledTaskBuilder::new()
            .with_task_type(DeleteInactiveContactsTask::TASK_TYPE)
            .build(),
        server_name: "web-01".to_string(),
        started_at: Utc::now(),
    }
}

fn cleanup_config(batch_size: u64) -> ContactCleanupConfig {
    ContactCleanupConfig {
        inactive_days: 30,
        batch_size,
        continue_after_seconds: 60,
    }
}

fn contacts_task(
    contacts: Arc<MockContactStore>,
    license: MockLicenseService,
    off_peak: MockOffPeakService,
    batch_size: u64,
) -> DeleteInactiveContactsTask {
    DeleteInactiveContactsTask::new(
        contacts,
        Arc::new(license),
        Arc::new(off_peak),
        cleanup_config(batch_size),
    )
}

fn inactive_contacts(count: usize) -> Vec<chrono::DateTime<Utc>> {
    (0..count).map(|_| Utc::now() - Duration::days(90)).collect()
}

#[tokio::test]
async fn test_contacts_remaining_continue_after_one_minute() {
    let off_peak_start = Utc::now() + Duration::hours(6);
    let contacts = Arc::new(MockContactStore::with_contacts(inactive_contacts(25)));
    let task = contacts_task(
        contacts.clone(),
        MockLicenseService::with_features([CONTACT_MANAGEMENT_FEATURE]),
        MockOffPeakService::starting_at(off_peak_start),
        10,
    );

    let before = Utc::now();
    let outcome = task.execute(&context()).await.unwrap();

    assert!(outcome.result.is_success());
    assert_eq!(contacts.count(), 15);
    let at = outcome.reschedule_at.unwrap();
    assert!(at >= before + Duration::seconds(60));
    assert!(at < off_peak_start);
}

#[tokio::test]
async fn test_last_batch_waits_for_off_peak() {
    let off_peak_start = Utc::now() + Duration::hours(6);
    let mut recent = inactive_contacts(5);
    recent.push(Utc::now() - Duration::days(1));
    let contacts = Arc::new(MockContactStore::with_contacts(recent));
    let task = contacts_task(
        contacts.clone(),
        MockLicenseService::with_features([CONTACT_MANAGEMENT_FEATURE]),
        MockOffPeakService::starting_at(off_peak_start),
        10,
    );

    let outcome = task.execute(&context()).await.unwrap();

    assert!(outcome.result.is_success());
    assert_eq!(contacts.count(), 1);
    assert_eq!(outcome.reschedule_at, Some(off_peak_start));
}

#[tokio::test]
async fn test_no_inactive_contacts_skips_delete() {
    let off_peak_start = Utc::now() + Duration::hours(2);
    let contacts = Arc::new(MockContactStore::new());
    let task = contacts_task(
        contacts.clone(),
        MockLicenseService::with_features([CONTACT_MANAGEMENT_FEATURE]),
        MockOffPeakService::starting_at(off_peak_start),
        10,
    );

    let outcome = task.execute(&context()).await.unwrap();

    assert_eq!(outcome.result, TaskResult::success());
    assert_eq!(contacts.delete_calls(), 0);
    assert_eq!(outcome.reschedule_at, Some(off_peak_start));
}

#[tokio::test]
async fn test_unlicensed_contacts_cleanup_reports_error() {
    let contacts = Arc::new(MockContactStore::with_contacts(inactive_contacts(3)));
    let task = contacts_task(
        contacts.clone(),
        MockLicenseService::unlicensed(),
        MockOffPeakService::starting_at(Utc::now() + Duration::hours(1)),
        10,
    );

    let outcome = task.execute(&context()).await.unwrap();

    assert_eq!(outcome.result, TaskResult::error(INSUFFICIENT_LICENSE_MESSAGE));
    assert!(outcome.reschedule_at.is_none());
    assert_eq!(contacts.count(), 3);
}

#[tokio::test]
async fn test_cleanup_webfarm_tasks_purges_old_entries() {
    let transport = Arc::new(InMemoryWebFarmTransport::new());
    let targets = vec!["web-02".to_string()];

    let mut old = WebFarmTask::new(WebFarmTaskType::ClearCache, "");
    old.created_at = Utc::now() - Duration::hours(48);
    transport.publish(&old, &targets).await.unwrap();
    let fresh = WebFarmTask::new(WebFarmTaskType::ClearCache, "");
    transport.publish(&fresh, &targets).await.unwrap();

    let task = CleanupWebFarmTasksTask::new(transport.clone(), 24);
    let outcome = task.execute(&context()).await.unwrap();

    assert!(outcome.result.is_success());
    assert_eq!(transport.total_pending().await, 1);
    let remaining = transport.fetch_pending("web-02", 10).await.unwrap();
    assert_eq!(remaining[0].id, fresh.id);
}

#[tokio::test]
async fn test_disable_debug_resets_and_broadcasts() {
    let transport = Arc::new(InMemoryWebFarmTransport::new());
    transport.register_server("web-02").await.unwrap();

    let mut registry = WebFarmTaskRegistry::new();
    registry
        .register_task(
            WebFarmTaskType::ResetDebugSettings,
            Arc::new(RecordingWebFarmHandler::new()),
            None,
            false,
        )
        .unwrap();
    let service = Arc::new(WebFarmService::new(
        Arc::new(registry),
        transport.clone(),
        Arc::new(SynchronizationSettings::default()),
        Arc::new(MetricsCollector::new()),
        WebFarmSettings {
            server_name: "web-01".to_string(),
            poll_interval: StdDuration::from_millis(50),
            fetch_batch_size: 10,
            servers: vec![],
        },
    ));

    let debug = Arc::new(DebugSettings::new(DebugConfig::default()));
    debug.set_debug_sql(true);
    debug.set_debug_requests(true);

    let task = DisableDebugTask::new(debug.clone(), service);
    let outcome = task.execute(&context()).await.unwrap();

    assert!(outcome.result.is_success());
    let current = debug.current();
    assert!(!current.debug_sql);
    assert!(!current.debug_requests);

    let pending = transport.fetch_pending("web-02", 10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].task_type, WebFarmTaskType::ResetDebugSettings);
    assert_eq!(pending[0].target, "web-01");
    assert_eq!(pending[0].creator.as_deref(), Some("web-01"));
}
