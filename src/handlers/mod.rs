pub mod analysis;
pub mod images;
pub mod reports;
pub mod system;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use analysis::{get_analysis_status, start_analysis, start_analysis_handler};
pub use images::get_image;
pub use reports::get_report;
pub use system::{health_check, swagger_ui_page, system_info};
pub use upload::upload_image;

use crate::{
    config::Config,
    file_processing::{FileProcessingConfig, FileProcessor},
    repositories::{AnalysisRepository, ReportRepository},
    services::{AnalysisPipeline, AnalysisWorkerPool, VisionClient},
    storage::{BlobStore, LocalBlobStore},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 应用状态
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn BlobStore>,
    pub local_storage: LocalBlobStore,
    pub file_processor: FileProcessor,
    pub analyses: AnalysisRepository,
    pub reports: ReportRepository,
    pub workers: AnalysisWorkerPool,
}

impl AppState {
    /// 组装存储、仓库、流水线与工作池
    pub fn build(config: Config, vision: Arc<dyn VisionClient>, cancel: CancellationToken) -> Self {
        let local_storage = LocalBlobStore::new(config.upload_dir());
        let storage: Arc<dyn BlobStore> = Arc::new(local_storage.clone());
        let analyses = AnalysisRepository::in_memory();
        let reports = ReportRepository::in_memory();

        let pipeline = AnalysisPipeline::new(
            Arc::clone(&storage),
            vision,
            analyses.clone(),
            reports.clone(),
            config.pipeline.clone(),
            config.inference.model_display_name.clone(),
        );
        let workers = AnalysisWorkerPool::start(Arc::new(pipeline), &config.pipeline, cancel);
        let file_processor = FileProcessor::new(FileProcessingConfig::from(config.file.clone()));

        Self {
            config: Arc::new(config),
            storage,
            local_storage,
            file_processor,
            analyses,
            reports,
            workers,
        }
    }
}
