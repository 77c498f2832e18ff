use crate::{
    handlers::{
        system::SystemInfo,
        upload::{UploadForm, UploadResponse},
    },
    models::{
        AnalysisState, AnalysisStatus, DiagnosticReport, Findings, ReportMetadata,
        StartAnalysisRequest,
    },
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // 分析API
        crate::handlers::upload::upload_image,
        crate::handlers::analysis::start_analysis_handler,
        crate::handlers::analysis::get_analysis_status,
        crate::handlers::images::get_image,
        crate::handlers::reports::get_report,
        // 系统API
        crate::handlers::system::health_check,
        crate::handlers::system::system_info,
    ),
    components(schemas(
        UploadForm,
        UploadResponse,
        StartAnalysisRequest,
        AnalysisState,
        AnalysisStatus,
        Findings,
        ReportMetadata,
        DiagnosticReport,
        SystemInfo,
    )),
    tags(
        (name = "analysis", description = "X光图像上传、分析进度与诊断报告"),
        (name = "system", description = "健康检查与系统信息")
    ),
    info(
        title = "X-ray Report API",
        description = "X光图像AI分析与诊断报告服务",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
