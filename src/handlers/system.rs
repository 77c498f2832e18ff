use axum::{
    Json,
    extract::State,
    response::Html,
};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use utoipa::ToSchema;

use super::AppState;
use crate::response::ApiResponse;

/// 系统信息
#[derive(Debug, Serialize, ToSchema)]
pub struct SystemInfo {
    pub name: String,
    pub version: String,
    pub ai_model: String,
    pub workers: usize,
    pub analyses: usize,
    pub reports: usize,
    pub storage_healthy: bool,
    pub timestamp: String,
}

/// 健康检查
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "服务正常"))
)]
pub async fn health_check() -> Json<JsonValue> {
    Json(json!({"status": "ok"}))
}

/// 系统信息
#[utoipa::path(
    get,
    path = "/api/system/info",
    tag = "system",
    responses((status = 200, description = "系统信息", body = SystemInfo))
)]
pub async fn system_info(State(app_state): State<AppState>) -> Json<ApiResponse<SystemInfo>> {
    let storage_healthy = match app_state.local_storage.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::error!("存储健康检查失败: {}", e);
            false
        }
    };

    Json(ApiResponse::success(SystemInfo {
        name: "X-ray Report Backend".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ai_model: app_state.config.inference.model_display_name.clone(),
        workers: app_state.config.pipeline.workers,
        analyses: app_state.analyses.count().await,
        reports: app_state.reports.count().await,
        storage_healthy,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Swagger UI 页面（OpenAPI JSON 路径：/api-docs/openapi.json）
pub async fn swagger_ui_page() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset=UTF-8>
  <title>X-ray Report API</title>
  <link rel=stylesheet href=https://cdn.jsdelivr.net/npm/swagger-ui-dist@5.11.0/swagger-ui.css>
</head>
<body>
  <div id=swagger-ui></div>
  <script src=https://cdn.jsdelivr.net/npm/swagger-ui-dist@5.11.0/swagger-ui-bundle.js></script>
  <script>
    window.onload = function() {
      window.ui = SwaggerUIBundle({
        url: '/api-docs/openapi.json',
        dom_id: '#swagger-ui',
        deepLinking: true
      });
    };
  </script>
</body>
</html>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{TestApp, read_json};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_check() {
        let app = TestApp::new().await;
        let response = app.get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_system_info_counts_registries() {
        let app = TestApp::new().await;
        app.upload_png("hand.png").await;

        let body = read_json(app.get("/api/system/info").await).await;
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"]["analyses"], 1);
        assert_eq!(body["data"]["storage_healthy"], true);
        assert_eq!(body["data"]["ai_model"], "Test Vision Model");
    }

    #[tokio::test]
    async fn test_openapi_document_lists_routes() {
        let app = TestApp::new().await;
        let body = read_json(app.get("/api-docs/openapi.json").await).await;

        let paths = body["paths"].as_object().unwrap();
        assert!(paths.contains_key("/api/upload"));
        assert!(paths.contains_key("/api/analyze"));
        assert!(paths.contains_key("/api/reports/{id}"));
    }
}
