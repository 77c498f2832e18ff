use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};

use super::AppState;
use crate::{
    error::{AppError, AppResult},
    models::{AnalysisQuery, AnalysisStatus, StartAnalysisRequest},
    services::{AnalysisJob, JobSlot},
    storage::is_valid_key,
};

/// 登记初始分析记录并把作业放入已预留的队列位置
///
/// 队列位置须在调用前预留。登记成功后入队不会失败也不会等待，
/// 请求在此之前被取消时不会留下记录。
pub async fn start_analysis(
    app_state: &AppState,
    slot: JobSlot<'_>,
    id: &str,
    filename: &str,
    original_name: &str,
) -> AppResult<AnalysisStatus> {
    let status = AnalysisStatus::started(id, AnalysisStatus::image_url_for(filename));
    app_state.analyses.create(status.clone()).await?;

    let handle = slot.submit(AnalysisJob {
        id: id.to_string(),
        filename: filename.to_string(),
        original_name: original_name.to_string(),
    });
    // 结果通过分析记录查询，不等待句柄
    tracing::debug!(analysis_id = %handle.id, "分析作业已提交");

    Ok(status)
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 为已上传的图像启动分析
#[utoipa::path(
    post,
    path = "/api/analyze",
    tag = "analysis",
    request_body = StartAnalysisRequest,
    responses(
        (status = 200, description = "分析已开始", body = AnalysisStatus),
        (status = 400, description = "缺少 id 或 filename"),
        (status = 409, description = "该ID的分析已存在"),
        (status = 500, description = "服务器内部错误"),
        (status = 503, description = "分析队列已满")
    )
)]
pub async fn start_analysis_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<StartAnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisStatus>, AppError> {
    let Json(request) =
        payload.map_err(|e| AppError::bad_request(format!("Invalid request body: {}", e.body_text())))?;

    let (Some(id), Some(filename)) = (required(request.id), required(request.filename)) else {
        return Err(AppError::bad_request("Missing required fields"));
    };

    if !is_valid_key(&filename) {
        return Err(AppError::bad_request("Invalid filename"));
    }

    let original_name = required(request.original_name).unwrap_or_else(|| filename.clone());
    let slot = app_state.workers.reserve()?;
    let status = start_analysis(&app_state, slot, &id, &filename, &original_name).await?;

    tracing::info!(analysis_id = %id, filename = %filename, "分析已开始");
    Ok(Json(status))
}

/// 查询分析状态
#[utoipa::path(
    get,
    path = "/api/analyze",
    tag = "analysis",
    params(
        ("id" = String, Query, description = "分析ID")
    ),
    responses(
        (status = 200, description = "当前分析状态", body = AnalysisStatus),
        (status = 400, description = "缺少分析ID"),
        (status = 404, description = "分析不存在")
    )
)]
pub async fn get_analysis_status(
    State(app_state): State<AppState>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AnalysisStatus>, AppError> {
    let id = required(query.id).ok_or_else(|| AppError::bad_request("Analysis ID required"))?;

    app_state
        .analyses
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Analysis not found"))
}
