use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::error::AppError;

/// 读取已上传的图像
#[utoipa::path(
    get,
    path = "/api/images/{filename}",
    tag = "analysis",
    params(
        ("filename" = String, Path, description = "存储文件名（<分析ID>.<扩展名>）")
    ),
    responses(
        (status = 200, description = "图像内容"),
        (status = 404, description = "图像不存在")
    )
)]
pub async fn get_image(
    State(app_state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let not_found = |e: AppError| {
        tracing::debug!(filename = %filename, error = %e, "图像读取失败");
        AppError::not_found("Image not found")
    };

    let metadata = app_state
        .storage
        .get_metadata(&filename)
        .await
        .map_err(not_found)?;
    let data = app_state.storage.load(&filename).await.map_err(not_found)?;

    Ok((
        [
            (header::CONTENT_TYPE, metadata.content_type),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        data,
    )
        .into_response())
}
