use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use webfarm_core::{
    models::{ScheduledTask, ScheduledTaskFilter},
    SchedulerError,
};
use webfarm_dispatcher::IntervalScheduler;

use crate::{
    error::{ApiError, ApiResult},
    response::{success, ApiResponse},
    routes::AppState,
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

/// 任务查询参数
#[derive(Debug, Default, Deserialize)]
pub struct TaskQueryParams {
    pub enabled: Option<bool>,
    pub task_type: Option<String>,
    pub name: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl TaskQueryParams {
    fn into_filter(self) -> ApiResult<ScheduledTaskFilter> {
        let page = self.page.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 1 {
            return Err(ApiError::BadRequest("page 必须从1开始".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ApiError::BadRequest(format!(
                "page_size 必须在 1 到 {MAX_PAGE_SIZE} 之间"
            )));
        }

        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| ApiError::BadRequest(format!("page 超出范围: {page}")))?;

        Ok(ScheduledTaskFilter {
            enabled: self.enabled,
            task_type: self.task_type,
            name_pattern: self.name,
            limit: Some(page_size),
            offset: Some(offset),
        })
    }
}

/// 带有可读调度频率的任务视图
#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: ScheduledTask,
    pub encoded_interval: String,
    pub frequency: String,
}

impl From<ScheduledTask> for TaskView {
    fn from(task: ScheduledTask) -> Self {
        let schedule = IntervalScheduler::new(task.interval.clone());
        Self {
            encoded_interval: task.interval.encode(),
            frequency: schedule.frequency_description(),
            task,
        }
    }
}

/// 获取任务列表
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskQueryParams>,
) -> ApiResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let tasks: Vec<TaskView> = state
        .repository
        .list(&filter)
        .await?
        .into_iter()
        .map(TaskView::from)
        .collect();
    Ok(success(tasks))
}

/// 获取单个任务
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let task = state
        .repository
        .get_by_id(id)
        .await?
        .ok_or(SchedulerError::TaskNotFound { id })?;
    Ok(success(TaskView::from(task)))
}

/// 立即执行任务
pub async fn run_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("通过API手动执行定时任务: {}", id);
    let record = state.scheduler.run_task_now(id).await?;
    let message = format!("任务 {} 执行完成: {}", record.task_name, record.result.status_label());
    Ok(ApiResponse::success_with_message(record, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_to_filter() {
        let params = TaskQueryParams {
            enabled: Some(true),
            page: Some(3),
            page_size: Some(20),
            ..Default::default()
        };
        let filter = params.into_filter().unwrap();
        assert_eq!(filter.enabled, Some(true));
        assert_eq!(filter.limit, Some(20));
        assert_eq!(filter.offset, Some(40));
    }

    #[test]
    fn test_query_params_reject_invalid_paging() {
        let zero_page = TaskQueryParams {
            page: Some(0),
            ..Default::default()
        };
        assert!(matches!(zero_page.into_filter(), Err(ApiError::BadRequest(_))));

        let huge_page = TaskQueryParams {
            page_size: Some(MAX_PAGE_SIZE + 1),
            ..Default::default()
        };
        assert!(matches!(huge_page.into_filter(), Err(ApiError::BadRequest(_))));

        let overflowing_page = TaskQueryParams {
            page: Some(i64::MAX),
            page_size: Some(50),
            ..Default::default()
        };
        assert!(matches!(
            overflowing_page.into_filter(),
            Err(ApiError::BadRequest(_))
        ));
    }
}
