use std::sync::Arc;

use chrono::{Duration, Utc};

use webfarm_core::models::ScheduledTaskStatus;
use webfarm_core::traits::ScheduledTaskRepository;
use webfarm_dispatcher::SchedulerRecoveryService;
use webfarm_testing_utils::{MockScheduledTaskRepository, ScheduledTaskBuilder};

#[tokio::test]
async fn test_recover_resets_own_and_expired_leases() {
    let now = Utc::now();
    let repo = Arc::new(MockScheduledTaskRepository::with_tasks(vec![
        ScheduledTaskBuilder::new().with_id(1).with_name("own").build(),
        ScheduledTaskBuilder::new().with_id(2).with_name("expired").build(),
        ScheduledTaskBuilder::new().with_id(3).with_name("foreign").build(),
        ScheduledTaskBuilder::new().with_id(4).with_name("idle").build(),
    ]));
    repo.try_acquire(1, "web-01", now, now + Duration::minutes(5))
        .await
        .unwrap();
    repo.try_acquire(2, "web-03", now - Duration::hours(1), now - Duration::minutes(30))
        .await
        .unwrap();
    repo.try_acquire(3, "web-02", now, now + Duration::minutes(5))
        .await
        .unwrap();

    let recovery = SchedulerRecoveryService::new(repo.clone(), "web-01");
    let report = recovery.recover_system_state().await.unwrap();

    assert_eq!(report.reset_tasks, 2);
    assert_eq!(repo.get(1).unwrap().status, ScheduledTaskStatus::Idle);
    assert_eq!(repo.get(2).unwrap().status, ScheduledTaskStatus::Idle);
    assert!(repo.get(2).unwrap().lease_owner.is_none());
    assert_eq!(repo.get(3).unwrap().status, ScheduledTaskStatus::Running);
    assert_eq!(repo.get(4).unwrap().status, ScheduledTaskStatus::Idle);
}

#[tokio::test]
async fn test_recover_with_nothing_to_reset() {
    let repo = Arc::new(MockScheduledTaskRepository::with_tasks(vec![
        ScheduledTaskBuilder::new().build(),
    ]));
    let recovery = SchedulerRecoveryService::new(repo, "web-01");

    let report = recovery.recover_system_state().await.unwrap();
    assert_eq!(report.reset_tasks, 0);
}
