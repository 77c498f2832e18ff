//! 服务端 HTTP 接口的客户端：上传、轮询分析状态、获取报告。

pub mod render;

pub use render::render_report;

use reqwest::{Client, StatusCode, multipart};
use serde::de::DeserializeOwned;
use std::{path::Path, time::Duration};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    config::ClientConfig,
    handlers::upload::UploadResponse,
    models::{AnalysisState, AnalysisStatus, DiagnosticReport},
    response::ApiResponse,
    storage::content_type_for,
};

/// 客户端错误
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("请求失败 ({status}): {message}")]
    Status { status: u16, message: String },
}

/// 轮询参数
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// 两次查询之间的固定间隔
    pub interval: Duration,
    /// 完成后跳转报告前的等待
    pub redirect_delay: Duration,
    /// 最多查询次数，None 表示不限
    pub max_attempts: Option<u32>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            redirect_delay: Duration::from_secs(2),
            max_attempts: None,
        }
    }
}

impl From<&ClientConfig> for PollOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            redirect_delay: Duration::from_millis(config.redirect_delay_ms),
            max_attempts: None,
        }
    }
}

/// 轮询结束的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { report_id: String },
    Failed { error: String },
    Cancelled,
    /// 达到最大查询次数时分析仍未结束
    GaveUp { last: AnalysisStatus },
}

/// X光报告服务客户端
#[derive(Debug, Clone)]
pub struct XrayClient {
    client: Client,
    base_url: String,
}

impl XrayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 上传图像，服务端随即开始分析
    pub async fn upload(&self, path: impl AsRef<Path>) -> Result<UploadResponse, ClientError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string());

        let part = multipart::Part::bytes(data)
            .file_name(filename.clone())
            .mime_str(content_type_for(&filename))?;
        let form = multipart::Form::new().part("file", part);

        debug!(file = %path.display(), "上传图像");
        let response = self
            .client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// 查询一次分析状态
    pub async fn get_status(&self, id: &str) -> Result<AnalysisStatus, ClientError> {
        let response = self
            .client
            .get(self.url("/api/analyze"))
            .query(&[("id", id)])
            .send()
            .await?;

        Self::decode(response).await
    }

    /// 获取报告，只请求一次
    pub async fn fetch_report(&self, report_id: &str) -> Result<DiagnosticReport, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/api/reports/{}", report_id)))
            .send()
            .await?;

        Self::decode(response).await
    }

    /// 以固定间隔轮询直到分析结束
    ///
    /// 每次查询到的状态都会交给 `on_update`。查询失败立即结束。
    pub async fn poll_until_terminal<F>(
        &self,
        id: &str,
        options: &PollOptions,
        cancel: &CancellationToken,
        mut on_update: F,
    ) -> PollOutcome
    where
        F: FnMut(&AnalysisStatus),
    {
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }

            let status = match self.get_status(id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(analysis_id = %id, error = %e, "查询分析状态失败");
                    return PollOutcome::Failed {
                        error: "Failed to fetch analysis status".to_string(),
                    };
                }
            };
            attempts += 1;
            on_update(&status);

            match status.status {
                AnalysisState::Completed => {
                    let Some(report_id) = status.report_id.clone() else {
                        return PollOutcome::Failed {
                            error: "Analysis completed without a report".to_string(),
                        };
                    };
                    if !wait(options.redirect_delay, cancel).await {
                        return PollOutcome::Cancelled;
                    }
                    return PollOutcome::Completed { report_id };
                }
                AnalysisState::Error => {
                    let error = status
                        .error
                        .filter(|e| !e.is_empty())
                        .unwrap_or_else(|| "Analysis failed".to_string());
                    return PollOutcome::Failed { error };
                }
                AnalysisState::Uploading | AnalysisState::Analyzing => {
                    if options.max_attempts.is_some_and(|max| attempts >= max) {
                        return PollOutcome::GaveUp { last: status };
                    }
                    if !wait(options.interval, cancel).await {
                        return PollOutcome::Cancelled;
                    }
                }
            }
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body)
            .map(|envelope| envelope.msg)
            .unwrap_or(body);

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(message));
        }
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// 可取消的等待，被取消时返回 false
async fn wait(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
