use crate::docs::ApiDoc;
use crate::handlers::{
    AppState, get_analysis_status, get_image, get_report, health_check, start_analysis_handler,
    swagger_ui_page, system_info, upload_image,
};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// 业务API路由
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload_image))
        .route(
            "/api/analyze",
            post(start_analysis_handler).get(get_analysis_status),
        )
        .route("/api/images/{filename}", get(get_image))
        .route("/api/reports/{id}", get(get_report))
}

/// 完整应用：系统路由、文档、业务路由与中间件
pub fn create_app(app_state: AppState) -> Router {
    let body_limit = app_state.config.body_limit();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        // 健康检查和系统信息
        .route("/health", get(health_check))
        .route("/api/system/info", get(system_info))
        // OpenAPI JSON 与 Swagger UI
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route("/swagger-ui", get(swagger_ui_page))
        .merge(create_api_routes())
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
