use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;

use webfarm_api::{create_app, AppState};
use webfarm_core::traits::ScheduledTaskRepository;
use webfarm_dispatcher::{
    PerformanceCounters, ScheduledTaskRegistry, SchedulerSettings, TaskScheduler,
};
use webfarm_infrastructure::MetricsCollector;
use webfarm_testing_utils::{
    MockScheduledTaskRepository, RecordingScheduledHandler, ScheduledTaskBuilder,
};

struct TestApp {
    router: Router,
    repo: Arc<MockScheduledTaskRepository>,
    handler: Arc<RecordingScheduledHandler>,
}

fn create_test_app() -> TestApp {
    let repo = Arc::new(MockScheduledTaskRepository::with_tasks(vec![
        ScheduledTaskBuilder::new()
            .with_id(1)
            .with_name("cleanup_contacts")
            .build(),
        ScheduledTaskBuilder::new()
            .with_id(2)
            .with_name("disabled_task")
            .not_due()
            .disabled()
            .build(),
    ]));
    let handler = Arc::new(RecordingScheduledHandler::succeeding());
    let mut registry = ScheduledTaskRegistry::new();
    registry.register("TestTask", handler.clone()).unwrap();

    let metrics = Arc::new(MetricsCollector::new());
    let counters = Arc::new(PerformanceCounters::new(repo.clone(), metrics.clone()));
    let scheduler = Arc::new(TaskScheduler::new(
        repo.clone(),
        Arc::new(registry),
        counters.clone(),
        metrics,
        SchedulerSettings {
            server_name: "web-01".to_string(),
            lease_duration: Duration::minutes(5),
            max_tasks_per_pass: 10,
            poll_interval: std::time::Duration::from_secs(60),
        },
    ));

    let router = create_app(AppState {
        repository: repo.clone(),
        scheduler,
        counters,
        metrics_handle: None,
    });

    TestApp {
        router,
        repo,
        handler,
    }
}

async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, body) = send(&app.router, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "webfarm-scheduler");
}

#[tokio::test]
async fn test_list_tasks_with_filter() {
    let app = create_test_app();

    let (status, body) = send(&app.router, "GET", "/api/tasks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app.router, "GET", "/api/tasks?enabled=true").await;
    assert_eq!(status, StatusCode::OK);
    let tasks = body["data"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["name"], "cleanup_contacts");
    assert_eq!(tasks[0]["frequency"], "每小时");
    assert!(tasks[0]["encoded_interval"]
        .as_str()
        .unwrap()
        .starts_with("hour;1;"));
}

#[tokio::test]
async fn test_list_tasks_rejects_bad_paging() {
    let app = create_test_app();
    let (status, body) = send(&app.router, "GET", "/api/tasks?page=0").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "BAD_REQUEST");

    let (status, body) = send(&app.router, "GET", "/api/tasks?page=9223372036854775807").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_get_task() {
    let app = create_test_app();

    let (status, body) = send(&app.router, "GET", "/api/tasks/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "disabled_task");
    assert_eq!(body["data"]["enabled"], false);

    let (status, body) = send(&app.router, "GET", "/api/tasks/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "TASK_NOT_FOUND");
}

#[tokio::test]
async fn test_run_task_now() {
    let app = create_test_app();

    let (status, body) = send(&app.router, "POST", "/api/tasks/2/run").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["task_name"], "disabled_task");
    assert_eq!(body["data"]["result"]["kind"], "success");
    assert_eq!(app.handler.calls(), 1);
    assert_eq!(app.repo.get(2).unwrap().execution_count, 1);
}

#[tokio::test]
async fn test_run_task_conflict_when_leased() {
    let app = create_test_app();
    let now = chrono::Utc::now();
    app.repo
        .try_acquire(1, "web-02", now, now + Duration::minutes(5))
        .await
        .unwrap();

    let (status, body) = send(&app.router, "POST", "/api/tasks/1/run").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "TASK_ALREADY_RUNNING");
    assert_eq!(app.handler.calls(), 0);
}

#[tokio::test]
async fn test_counters() {
    let app = create_test_app();
    let (status, body) = send(&app.router, "GET", "/api/counters").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["running_tasks"], 0);
    assert_eq!(body["data"]["tasks_in_queue"], 1);
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let app = create_test_app();
    let (status, _) = send(&app.router, "GET", "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
