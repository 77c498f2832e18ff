use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::Client;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::InferenceConfig;
use crate::error::AppError;

/// 放射科报告生成的系统提示词
pub const SYSTEM_PROMPT: &str = "You are an expert radiologist AI assistant specializing in X-ray image analysis.
Provide comprehensive, professional diagnostic reports following medical standards.
Your analysis should include:
1. Clinical overview (2-3 sentences)
2. Detailed findings (3-5 specific observations)
3. Recommendations (2-4 actionable suggestions)

Format your response as JSON with this structure:
{
  \"overview\": \"Brief clinical summary\",
  \"detailed\": [\"Finding 1\", \"Finding 2\", \"Finding 3\"],
  \"recommendations\": [\"Recommendation 1\", \"Recommendation 2\"],
  \"confidence\": 85
}

Be thorough, accurate, and maintain professional medical terminology while being clear.
Include confidence score (0-100) based on image quality and diagnostic clarity.";

/// 推理服务错误
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HTTP请求失败: {0}")]
    Http(String),

    #[error("推理请求超时（{0}秒）")]
    Timeout(u64),

    /// 上游返回非成功状态码，status_text 为标准原因短语
    #[error("AI analysis failed: {status_text}")]
    Api { status: u16, status_text: String },

    #[error("No analysis content received from AI")]
    MissingContent,

    #[error("推理客户端配置错误: {0}")]
    Configuration(String),
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        AppError::inference(err.to_string())
    }
}

/// 一次视觉推理请求
#[derive(Debug, Clone)]
pub struct VisionRequest {
    /// 用户上传时的原始文件名
    pub original_name: String,
    /// 图像MIME类型
    pub mime_type: String,
    /// Base64 编码后的图像内容
    pub image_base64: String,
}

impl VisionRequest {
    pub fn new(original_name: impl Into<String>, mime_type: impl Into<String>, image: &[u8]) -> Self {
        Self {
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            image_base64: BASE64.encode(image),
        }
    }

    /// data URL 形式的图像
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.image_base64)
    }

    /// 用户消息中的文本部分
    pub fn instruction(&self) -> String {
        format!(
            "Please analyze this X-ray image and provide a comprehensive diagnostic report. Image filename: {}",
            self.original_name
        )
    }

    /// 构造 chat/completions 请求体
    pub fn to_chat_body(&self, model: &str) -> JsonValue {
        json!({
            "model": model,
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT,
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": self.instruction() },
                        { "type": "image_url", "image_url": { "url": self.data_url() } }
                    ]
                }
            ]
        })
    }
}

/// 视觉语言模型客户端
#[async_trait]
pub trait VisionClient: Send + Sync + std::fmt::Debug {
    /// 发送图像并返回模型回复的原始文本
    async fn describe_image(&self, request: &VisionRequest) -> Result<String, InferenceError>;
}

/// 基于 OpenAI 兼容 chat/completions 接口的视觉客户端
#[derive(Debug, Clone)]
pub struct HttpVisionClient {
    client: Client,
    config: InferenceConfig,
}

impl HttpVisionClient {
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InferenceError::Configuration(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 读取 choices[0].message.content，兼容字符串与分段数组两种格式
    pub fn extract_content(response: &JsonValue) -> Option<String> {
        let content = response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))?;

        let text = match content {
            JsonValue::String(text) => text.clone(),
            JsonValue::Array(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    JsonValue::String(text) => Some(text.as_str()),
                    other => other.get("text").and_then(|t| t.as_str()),
                })
                .collect::<Vec<_>>()
                .join(""),
            _ => return None,
        };

        if text.is_empty() { None } else { Some(text) }
    }
}

#[async_trait]
impl VisionClient for HttpVisionClient {
    async fn describe_image(&self, request: &VisionRequest) -> Result<String, InferenceError> {
        let body = request.to_chat_body(&self.config.model);

        debug!(
            endpoint = %self.config.endpoint,
            model = %self.config.model,
            image = %request.original_name,
            "发送视觉推理请求"
        );

        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");
        for (name, value) in &self.config.extra_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(self.config.timeout_secs)
            } else {
                InferenceError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "推理服务返回错误");
            return Err(InferenceError::Api {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let response_json: JsonValue = response
            .json()
            .await
            .map_err(|_| InferenceError::MissingContent)?;

        Self::extract_content(&response_json).ok_or(InferenceError::MissingContent)
    }
}
