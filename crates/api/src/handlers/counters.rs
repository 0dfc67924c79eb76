use axum::extract::State;

use crate::{error::ApiResult, response::success, routes::AppState};

/// 当前性能计数器
pub async fn get_counters(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let snapshot = state.counters.snapshot().await?;
    Ok(success(snapshot))
}
