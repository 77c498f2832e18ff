use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{AppState, analysis::start_analysis};
use crate::error::AppError;

/// 上传响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// 分析ID
    pub id: String,
    /// 存储文件名
    pub filename: String,
    /// 文件大小（字节）
    pub size: u64,
    /// 客户端声明的MIME类型
    #[serde(rename = "type")]
    pub file_type: String,
    pub message: String,
    /// 文件SHA256
    pub sha256: String,
}

/// 上传表单（仅用于接口文档）
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// JPEG、PNG 或 DICOM 图像
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// 上传的文件字段
struct UploadedFile {
    data: Vec<u8>,
    filename: String,
    content_type: String,
}

fn multipart_error(e: MultipartError) -> AppError {
    let error_msg = e.to_string();
    if error_msg.contains("body longer than") || error_msg.contains("body is too large") {
        AppError::bad_request("Upload is too large")
    } else {
        AppError::bad_request(format!("Failed to read upload: {}", e))
    }
}

/// 上传X光图像并开始分析
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "analysis",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "上传成功，分析已开始", body = UploadResponse),
        (status = 400, description = "缺少文件、类型不支持或超过大小限制"),
        (status = 500, description = "写入存储失败"),
        (status = 503, description = "分析队列已满")
    )
)]
pub async fn upload_image(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?.to_vec();

        upload = Some(UploadedFile {
            data,
            filename,
            content_type,
        });
    }

    let upload = upload.ok_or_else(|| AppError::bad_request("No file provided"))?;

    let id = Uuid::new_v4().to_string();
    let processed = app_state
        .file_processor
        .process_upload(&id, &upload.data, &upload.filename, &upload.content_type)
        .await?;

    // 先占队列位置，队列满时不写入文件也不登记
    let slot = app_state.workers.reserve()?;

    app_state
        .storage
        .save(&processed.storage_filename, &upload.data)
        .await?;

    tracing::info!(
        analysis_id = %id,
        filename = %processed.storage_filename,
        original_name = %processed.original_name,
        size = processed.size,
        detected_type = processed.detected_type,
        "图像上传成功"
    );

    start_analysis(
        &app_state,
        slot,
        &id,
        &processed.storage_filename,
        &processed.original_name,
    )
    .await?;

    Ok(Json(UploadResponse {
        id,
        filename: processed.storage_filename,
        size: processed.size,
        file_type: processed.declared_type,
        message: "File uploaded successfully".to_string(),
        sha256: processed.sha256,
    }))
}
