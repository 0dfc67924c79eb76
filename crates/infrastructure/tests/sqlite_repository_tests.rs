use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use webfarm_core::models::{
    IntervalPeriod, ScheduledTask, ScheduledTaskFilter, ScheduledTaskRunUpdate,
    ScheduledTaskStatus, TaskInterval,
};
use webfarm_core::traits::{ContactStore, ScheduledTaskRepository};
use webfarm_core::SchedulerError;
use webfarm_infrastructure::{DatabaseManager, SqliteContactStore, SqliteScheduledTaskRepository};

fn hourly_task(name: &str) -> ScheduledTask {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    ScheduledTask::new(
        name.to_string(),
        "DeleteInactiveContacts".to_string(),
        TaskInterval::new(IntervalPeriod::Hour, 1, start),
    )
}

async fn repository() -> Result<(DatabaseManager, SqliteScheduledTaskRepository)> {
    let db = DatabaseManager::in_memory().await?;
    let repo = SqliteScheduledTaskRepository::new(db.pool().clone());
    Ok((db, repo))
}

#[tokio::test]
async fn test_scheduled_task_crud() -> Result<()> {
    let (_db, repo) = repository().await?;

    let created = repo.create(&hourly_task("contacts.cleanup")).await?;
    assert!(created.id > 0);
    assert_eq!(created.status, ScheduledTaskStatus::Idle);
    assert_eq!(created.interval.period, IntervalPeriod::Hour);

    let by_name = repo.get_by_name("contacts.cleanup").await?.unwrap();
    assert_eq!(by_name.id, created.id);

    let mut updated = by_name.clone();
    updated.display_name = "Delete inactive contacts".to_string();
    updated.enabled = false;
    repo.update(&updated).await?;

    let reloaded = repo.get_by_id(created.id).await?.unwrap();
    assert_eq!(reloaded.display_name, "Delete inactive contacts");
    assert!(!reloaded.enabled);

    let disabled = repo
        .list(&ScheduledTaskFilter {
            enabled: Some(false),
            ..Default::default()
        })
        .await?;
    assert_eq!(disabled.len(), 1);

    repo.delete(created.id).await?;
    assert!(repo.get_by_id(created.id).await?.is_none());
    assert!(matches!(
        repo.delete(created.id).await,
        Err(SchedulerError::TaskNotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_name_is_rejected() -> Result<()> {
    let (_db, repo) = repository().await?;
    repo.create(&hourly_task("dup")).await?;
    let err = repo.create(&hourly_task("dup")).await.unwrap_err();
    assert!(matches!(err, SchedulerError::TaskAlreadyExists { .. }));
    Ok(())
}

#[tokio::test]
async fn test_due_tasks_respect_server_restriction() -> Result<()> {
    let (_db, repo) = repository().await?;
    let now = Utc::now();

    let mut due = hourly_task("due");
    due.next_run_time = Some(now - Duration::minutes(5));
    repo.create(&due).await?;

    let mut future = hourly_task("future");
    future.next_run_time = Some(now + Duration::minutes(5));
    repo.create(&future).await?;

    let mut pinned = hourly_task("pinned");
    pinned.next_run_time = Some(now - Duration::minutes(1));
    pinned.server_name = Some("NODE-B".to_string());
    repo.create(&pinned).await?;

    let on_a: Vec<String> = repo
        .get_due_tasks(now, "node-a", 10)
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(on_a, vec!["due".to_string()]);

    let on_b = repo.get_due_tasks(now, "node-b", 10).await?;
    assert_eq!(on_b.len(), 2);
    assert_eq!(on_b[0].name, "due");

    assert_eq!(repo.count_due_tasks(now).await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_lease_prevents_concurrent_runs() -> Result<()> {
    let (_db, repo) = repository().await?;
    let now = Utc::now();
    let mut task = hourly_task("leased");
    task.next_run_time = Some(now - Duration::minutes(1));
    let task = repo.create(&task).await?;

    let lease_until = now + Duration::minutes(30);
    assert!(repo.try_acquire(task.id, "node-a", now, lease_until).await?);
    assert!(!repo.try_acquire(task.id, "node-b", now, lease_until).await?);
    assert!(repo.get_due_tasks(now, "node-a", 10).await?.is_empty());

    let next = now + Duration::hours(1);
    let update = ScheduledTaskRunUpdate {
        next_run_time: Some(next),
        last_result: Some("ok".to_string()),
        last_run_time: now,
        disable: false,
    };
    assert!(!repo.complete_run(task.id, "node-b", &update).await?);
    assert!(repo.complete_run(task.id, "node-a", &update).await?);

    let done = repo.get_by_id(task.id).await?.unwrap();
    assert_eq!(done.status, ScheduledTaskStatus::Idle);
    assert_eq!(done.execution_count, 1);
    assert_eq!(done.last_result.as_deref(), Some("ok"));
    assert_eq!(done.next_run_time.map(|t| t.timestamp()), Some(next.timestamp()));
    assert!(done.lease_owner.is_none());
    Ok(())
}

#[tokio::test]
async fn test_due_lease_rechecks_next_run_time() -> Result<()> {
    let (_db, repo) = repository().await?;
    let now = Utc::now();
    let mut task = hourly_task("hourly");
    task.next_run_time = Some(now - Duration::minutes(1));
    let task = repo.create(&task).await?;
    let lease_until = now + Duration::minutes(30);

    // node-a 执行完成并推进到下一个周期
    assert!(repo.try_acquire_due(task.id, "node-a", now, lease_until).await?);
    let update = ScheduledTaskRunUpdate {
        next_run_time: Some(now + Duration::hours(1)),
        last_result: None,
        last_run_time: now,
        disable: false,
    };
    assert!(repo.complete_run(task.id, "node-a", &update).await?);

    // node-b 持有过时的到期列表，不能再次获取
    assert!(!repo.try_acquire_due(task.id, "node-b", now, lease_until).await?);
    assert_eq!(repo.get_by_id(task.id).await?.unwrap().execution_count, 1);

    // 手动执行不检查到期时间
    assert!(repo.try_acquire(task.id, "node-b", now, lease_until).await?);
    Ok(())
}

#[tokio::test]
async fn test_due_lease_skips_disabled_and_unscheduled_tasks() -> Result<()> {
    let (_db, repo) = repository().await?;
    let now = Utc::now();
    let lease_until = now + Duration::minutes(30);

    let mut disabled = hourly_task("disabled");
    disabled.enabled = false;
    let disabled = repo.create(&disabled).await?;
    let mut unscheduled = hourly_task("unscheduled");
    unscheduled.next_run_time = None;
    let unscheduled = repo.create(&unscheduled).await?;

    assert!(!repo.try_acquire_due(disabled.id, "node-a", now, lease_until).await?);
    assert!(!repo.try_acquire_due(unscheduled.id, "node-a", now, lease_until).await?);
    assert_eq!(
        repo.get_by_id(disabled.id).await?.unwrap().status,
        ScheduledTaskStatus::Idle
    );
    Ok(())
}

#[tokio::test]
async fn test_expired_lease_can_be_taken_over() -> Result<()> {
    let (_db, repo) = repository().await?;
    let now = Utc::now();
    let task = repo.create(&hourly_task("stale")).await?;

    assert!(
        repo.try_acquire(task.id, "node-a", now - Duration::hours(2), now - Duration::hours(1))
            .await?
    );
    assert!(repo.try_acquire(task.id, "node-b", now, now + Duration::minutes(30)).await?);
    Ok(())
}

#[tokio::test]
async fn test_fatal_run_disables_task() -> Result<()> {
    let (_db, repo) = repository().await?;
    let now = Utc::now();
    let task = repo.create(&hourly_task("fatal")).await?;

    repo.try_acquire(task.id, "node-a", now, now + Duration::minutes(30)).await?;
    repo.complete_run(
        task.id,
        "node-a",
        &ScheduledTaskRunUpdate {
            next_run_time: None,
            last_result: Some("boom".to_string()),
            last_run_time: now,
            disable: true,
        },
    )
    .await?;

    let reloaded = repo.get_by_id(task.id).await?.unwrap();
    assert!(!reloaded.enabled);
    assert!(reloaded.next_run_time.is_none());
    Ok(())
}

#[tokio::test]
async fn test_reset_corrupted_releases_own_and_expired_leases() -> Result<()> {
    let (_db, repo) = repository().await?;
    let now = Utc::now();
    let own = repo.create(&hourly_task("own")).await?;
    let foreign = repo.create(&hourly_task("foreign")).await?;

    repo.try_acquire(own.id, "node-a", now, now + Duration::minutes(30)).await?;
    repo.try_acquire(foreign.id, "node-b", now, now + Duration::minutes(30)).await?;

    assert_eq!(repo.reset_corrupted("node-a", now).await?, 1);
    assert_eq!(
        repo.get_by_id(own.id).await?.unwrap().status,
        ScheduledTaskStatus::Idle
    );
    assert_eq!(
        repo.get_by_id(foreign.id).await?.unwrap().status,
        ScheduledTaskStatus::Running
    );
    Ok(())
}

#[tokio::test]
async fn test_contact_store_deletes_in_batches() -> Result<()> {
    let db = DatabaseManager::in_memory().await?;
    let store = SqliteContactStore::new(db.pool().clone());
    let now = Utc::now();

    for i in 0..5 {
        store
            .insert(&format!("old{i}@example.com"), now - Duration::days(400))
            .await?;
    }
    store.insert("fresh@example.com", now).await?;

    let cutoff = now - Duration::days(365);
    assert_eq!(store.count_inactive(cutoff).await?, 5);
    assert_eq!(store.delete_inactive(cutoff, 2).await?, 2);
    assert_eq!(store.count_inactive(cutoff).await?, 3);
    assert_eq!(store.delete_inactive(cutoff, 10).await?, 3);
    assert_eq!(store.count_inactive(cutoff).await?, 0);
    Ok(())
}
