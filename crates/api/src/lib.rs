//! # Web农场调度器 API
//!
//! 基于 Axum 的HTTP接口，用于查看定时任务、手动执行任务和读取性能计数器。
//!
//! ## API 端点
//!
//! - `GET /health` - 健康检查
//! - `GET /metrics` - Prometheus 指标
//! - `GET /api/tasks` - 定时任务列表，支持 `enabled`、`task_type`、`name`、`page`、`page_size`
//! - `GET /api/tasks/{id}` - 定时任务详情
//! - `POST /api/tasks/{id}/run` - 立即执行任务
//! - `GET /api/counters` - 性能计数器快照
//!
//! ## 响应格式
//!
//! ```json
//! {
//!   "success": true,
//!   "data": { "running_tasks": 0, "tasks_in_queue": 2 },
//!   "message": null,
//!   "timestamp": "2024-01-01T00:00:00Z"
//! }
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, trace_layer};
pub use routes::{create_routes, AppState};

/// 创建完整的API应用
pub fn create_app(state: AppState) -> Router {
    create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(cors_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    )
}
