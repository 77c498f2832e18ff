use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::vision_client::{InferenceError, VisionClient, VisionRequest};

/// 返回固定回复的视觉客户端
#[derive(Debug, Clone)]
pub struct StaticVisionClient {
    reply: String,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl StaticVisionClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 返回一份结构完整的JSON报告
    pub fn well_formed() -> Self {
        Self::new(
            r#"{"overview":"No acute cardiopulmonary abnormality.","detailed":["Lungs are clear","Heart size is normal","No pleural effusion"],"recommendations":["Routine follow up"],"confidence":88}"#,
        )
    }

    /// 每次调用前等待指定时长
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionClient for StaticVisionClient {
    async fn describe_image(&self, _request: &VisionRequest) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.reply.clone())
    }
}

/// 始终返回上游错误的视觉客户端
#[derive(Debug, Clone)]
pub struct FailingVisionClient {
    status: u16,
    status_text: String,
}

impl FailingVisionClient {
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
        }
    }

    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
    }
}

#[async_trait]
impl VisionClient for FailingVisionClient {
    async fn describe_image(&self, _request: &VisionRequest) -> Result<String, InferenceError> {
        Err(InferenceError::Api {
            status: self.status,
            status_text: self.status_text.clone(),
        })
    }
}
