use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use webfarm_core::SchedulerError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("调度器错误: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("内部服务器错误: {0}")]
    Internal(String),

    #[error("未找到资源")]
    NotFound,

    #[error("请求参数错误: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type, suggestions) = match &self {
            ApiError::Scheduler(SchedulerError::TaskNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("定时任务 ID {} 不存在", id),
                "TASK_NOT_FOUND",
                vec![
                    "请检查任务ID是否正确".to_string(),
                    "使用 GET /api/tasks 查看所有定时任务".to_string(),
                ],
            ),
            ApiError::Scheduler(SchedulerError::TaskAlreadyRunning { id }) => (
                StatusCode::CONFLICT,
                format!("定时任务 ID {} 正在运行", id),
                "TASK_ALREADY_RUNNING",
                vec!["任务执行完成后再重试".to_string()],
            ),
            ApiError::Scheduler(
                err @ (SchedulerError::InvalidInterval { .. }
                | SchedulerError::InvalidTaskParams(_)
                | SchedulerError::InvalidTaskArguments { .. }),
            ) => (
                StatusCode::BAD_REQUEST,
                err.to_string(),
                "INVALID_PARAMETERS",
                vec!["请检查请求参数格式是否正确".to_string()],
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                format!("请求参数错误: {}", msg),
                "BAD_REQUEST",
                vec!["请检查请求格式和参数".to_string()],
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "请求的资源不存在".to_string(),
                "NOT_FOUND",
                vec!["请检查请求URL是否正确".to_string()],
            ),
            ApiError::Scheduler(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR",
                vec![
                    "系统遇到内部错误，请稍后重试".to_string(),
                    "查看 GET /health 检查系统状态".to_string(),
                ],
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR",
                vec![format!("错误详情: {}", msg)],
            ),
        };

        if status.is_server_error() {
            tracing::error!("请求处理失败: {}", self);
        }

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_scheduler_error_conversion() {
        let api_error: ApiError = SchedulerError::TaskNotFound { id: 123 }.into();
        assert!(matches!(
            api_error,
            ApiError::Scheduler(SchedulerError::TaskNotFound { id: 123 })
        ));
    }

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (
                ApiError::Scheduler(SchedulerError::TaskNotFound { id: 1 }),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Scheduler(SchedulerError::TaskAlreadyRunning { id: 1 }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Scheduler(SchedulerError::InvalidInterval {
                    value: "x".to_string(),
                    message: "格式错误".to_string(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Scheduler(SchedulerError::DatabaseOperation("连接失败".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::BadRequest("page".to_string()), StatusCode::BAD_REQUEST),
            (ApiError::NotFound, StatusCode::NOT_FOUND),
            (
                ApiError::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_api_error_display() {
        assert_eq!(format!("{}", ApiError::NotFound), "未找到资源");
    }
}
