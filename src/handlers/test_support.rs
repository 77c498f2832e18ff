use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, header},
    response::Response,
};
use serde_json::Value as JsonValue;
use std::{path::Path, sync::Arc, time::Duration};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use super::AppState;
use crate::{
    config::{Config, PipelineConfig},
    models::AnalysisStatus,
    routes::create_app,
    services::{StaticVisionClient, VisionClient},
};

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
const BOUNDARY: &str = "XRAYTESTBOUNDARY";

/// 基于临时目录与模拟视觉客户端的完整应用
pub struct TestApp {
    _dir: TempDir,
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_vision(Arc::new(StaticVisionClient::well_formed())).await
    }

    pub async fn with_vision(vision: Arc<dyn VisionClient>) -> Self {
        Self::with_config(vision, |_, _| {}).await
    }

    /// 在默认测试配置上再做调整，第二个参数是临时目录
    pub async fn with_config(
        vision: Arc<dyn VisionClient>,
        configure: impl FnOnce(&mut Config, &Path),
    ) -> Self {
        let dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.storage.upload_dir = dir.path().join("uploads").to_string_lossy().into_owned();
        config.pipeline = PipelineConfig::immediate();
        config.inference.model_display_name = "Test Vision Model".to_string();
        configure(&mut config, dir.path());

        let state = AppState::build(config, vision, CancellationToken::new());
        let router = create_app(state.clone());

        Self {
            _dir: dir,
            state,
            router,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// 直接写入存储，不经过上传接口
    pub async fn put_image(&self, filename: &str) {
        self.state.storage.save(filename, PNG_BYTES).await.unwrap();
    }

    /// 通过上传接口提交一张PNG，返回分析ID
    pub async fn upload_png(&self, filename: &str) -> String {
        let response = self
            .send(multipart_request("file", filename, "image/png", PNG_BYTES))
            .await;
        assert!(response.status().is_success());
        read_json(response).await["id"].as_str().unwrap().to_string()
    }

    /// 等待分析进入终态
    pub async fn wait_terminal(&self, id: &str) -> AnalysisStatus {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(status) = self.state.analyses.get(id).await {
                    if status.is_terminal() {
                        return status;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap()
    }
}

pub fn json_request(method: Method, uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// 构造单文件 multipart 请求
pub fn multipart_request(
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn read_json(response: Response) -> JsonValue {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
