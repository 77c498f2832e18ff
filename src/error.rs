use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::response::{ApiResponse, ResponseCode};

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("File size exceeds {}MB limit", megabytes(.max_size))]
    FileTooLarge { max_size: u64 },

    #[error("Invalid file type: {file_type}. Please upload JPEG, PNG, or DICOM files.")]
    UnsupportedFileType { file_type: String },

    #[error("文件未找到: {path}")]
    FileNotFound { path: String },

    #[error("{0}")]
    Inference(String),

    #[error("分析已取消")]
    Cancelled,

    #[error("Analysis queue is full, please retry later")]
    QueueFull,

    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("资源冲突: {0}")]
    Conflict(String),

    #[error("资源不存在: {resource}")]
    NotFound { resource: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            AppError::Io(_) => (ResponseCode::INTERNAL_ERROR, "文件IO错误".to_string()),
            AppError::Config(_) => (ResponseCode::INTERNAL_ERROR, "配置错误".to_string()),
            AppError::Validation(msg) => (ResponseCode::BAD_REQUEST, msg.clone()),
            AppError::Storage(_) => (ResponseCode::STORAGE_ERROR, self.to_string()),
            // 文件类型与大小错误统一按 400 返回
            AppError::FileTooLarge { .. } | AppError::UnsupportedFileType { .. } => {
                (ResponseCode::BAD_REQUEST, self.to_string())
            }
            AppError::FileNotFound { path } => {
                (ResponseCode::NOT_FOUND, format!("文件未找到: {}", path))
            }
            AppError::Inference(_) => (ResponseCode::UPSTREAM_ERROR, self.to_string()),
            AppError::Cancelled => (ResponseCode::INTERNAL_ERROR, self.to_string()),
            AppError::QueueFull => (ResponseCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::Internal(_) => (ResponseCode::INTERNAL_ERROR, "服务器内部错误".to_string()),
            AppError::BadRequest(msg) => (ResponseCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (ResponseCode::CONFLICT, msg.clone()),
            AppError::NotFound { resource } => (ResponseCode::NOT_FOUND, resource.clone()),
        };

        // 记录错误日志
        tracing::error!("应用错误: {}", self);

        ApiResponse::<()>::error(code, message).into_response()
    }
}

fn megabytes(bytes: &u64) -> u64 {
    bytes / 1024 / 1024
}

/// 应用程序Result类型别名
pub type AppResult<T> = Result<T, AppError>;

/// 错误构造辅助函数
impl AppError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    pub fn bad_request<T: Into<String>>(msg: T) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found<T: Into<String>>(resource: T) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn file_not_found<T: Into<String>>(path: T) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn service_unavailable<T: Into<String>>(msg: T) -> Self {
        Self::Internal(anyhow::anyhow!(msg.into()))
    }

    pub fn file_too_large(max_size: u64) -> Self {
        Self::FileTooLarge { max_size }
    }

    pub fn unsupported_file_type<T: Into<String>>(file_type: T) -> Self {
        Self::UnsupportedFileType {
            file_type: file_type.into(),
        }
    }

    pub fn inference<T: Into<String>>(msg: T) -> Self {
        Self::Inference(msg.into())
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        Self::Storage(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    /// 面向用户的错误描述（写入分析记录的 error 字段）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Inference(_) => self.to_string(),
            AppError::Cancelled => "Analysis cancelled".to_string(),
            AppError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                "Uploaded image could not be read".to_string()
            }
            AppError::FileNotFound { path } => format!("Uploaded image not found: {}", path),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_error_creation() {
        let err = AppError::validation("测试验证错误");
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), "验证错误: 测试验证错误");
    }

    #[test]
    fn test_file_errors_map_to_bad_request() {
        let response = AppError::file_too_large(10 * 1024 * 1024).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::unsupported_file_type("text/plain").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_and_conflict_status() {
        assert_eq!(
            AppError::not_found("Report not found").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::conflict("dup").into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::QueueFull.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::storage("disk full").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_inference_user_message_keeps_upstream_text() {
        let err = AppError::inference("AI analysis failed: Internal Server Error");
        assert_eq!(err.user_message(), "AI analysis failed: Internal Server Error");
        assert_eq!(AppError::Cancelled.user_message(), "Analysis cancelled");
    }
}
