use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use webfarm_core::traits::ScheduledTaskRepository;
use webfarm_dispatcher::{PerformanceCounters, TaskScheduler};

use crate::handlers::{
    counters::get_counters,
    health::health_check,
    metrics::render_metrics,
    tasks::{get_task, list_tasks, run_task},
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn ScheduledTaskRepository>,
    pub scheduler: Arc<TaskScheduler>,
    pub counters: Arc<PerformanceCounters>,
    /// 未安装Prometheus记录器时为 None，`/metrics` 返回 404
    pub metrics_handle: Option<PrometheusHandle>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        // 定时任务API
        .route("/api/tasks", get(list_tasks))
        .route("/api/tasks/{id}", get(get_task))
        .route("/api/tasks/{id}/run", post(run_task))
        // 性能计数器
        .route("/api/counters", get(get_counters))
        .with_state(state)
}
