use axum::{
    Json,
    extract::{Path, State},
};

use super::AppState;
use crate::{error::AppError, models::DiagnosticReport};

/// 获取诊断报告
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    tag = "analysis",
    params(
        ("id" = String, Path, description = "报告ID（report_<分析ID>）")
    ),
    responses(
        (status = 200, description = "诊断报告", body = DiagnosticReport),
        (status = 404, description = "报告不存在")
    )
)]
pub async fn get_report(
    State(app_state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Json<DiagnosticReport>, AppError> {
    app_state
        .reports
        .get(&report_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Report not found"))
}
