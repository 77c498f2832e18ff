use chrono::Utc;
use std::{sync::Arc, time::Duration, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::findings_parser::parse_findings;
use super::vision_client::{VisionClient, VisionRequest};
use crate::{
    config::PipelineConfig,
    error::{AppError, AppResult},
    file_processing::FileAnalyzer,
    models::{AnalysisStatus, DiagnosticReport, ReportMetadata, image_type_of},
    repositories::{AnalysisRepository, ReportRepository},
    storage::BlobStore,
};

/// 一次分析作业
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisJob {
    /// 分析ID
    pub id: String,
    /// 存储文件名
    pub filename: String,
    /// 原始文件名
    pub original_name: String,
}

/// 作业执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed {
        report_id: String,
        /// 回复解析方式：parsed / recovered / generic
        parse_kind: &'static str,
    },
    Failed {
        error: String,
    },
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// 分析流水线：读取图像、调用视觉模型、解析回复、生成报告
///
/// 每个阶段都会先写入分析记录再执行，客户端轮询看到的进度依次为
/// 10、30、60、90，最终以 100（完成）或错误结束。
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    blob_store: Arc<dyn BlobStore>,
    vision: Arc<dyn VisionClient>,
    analyses: AnalysisRepository,
    reports: ReportRepository,
    analyzer: FileAnalyzer,
    config: PipelineConfig,
    model_display_name: String,
}

impl AnalysisPipeline {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        vision: Arc<dyn VisionClient>,
        analyses: AnalysisRepository,
        reports: ReportRepository,
        config: PipelineConfig,
        model_display_name: impl Into<String>,
    ) -> Self {
        Self {
            blob_store,
            vision,
            analyses,
            reports,
            analyzer: FileAnalyzer::new(),
            config,
            model_display_name: model_display_name.into(),
        }
    }

    /// 执行作业，失败时把分析记录置为错误
    pub async fn run(&self, job: &AnalysisJob, cancel: &CancellationToken) -> PipelineOutcome {
        let started = Instant::now();
        info!(analysis_id = %job.id, filename = %job.filename, "开始分析");

        match self.execute(job, cancel, started).await {
            Ok((report_id, parse_kind)) => {
                info!(
                    analysis_id = %job.id,
                    report_id = %report_id,
                    parse_kind,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "分析完成"
                );
                PipelineOutcome::Completed {
                    report_id,
                    parse_kind,
                }
            }
            Err(e) => {
                let message = e.user_message();
                error!(analysis_id = %job.id, error = %e, "分析失败");
                self.mark_failed(&job.id, &message).await;
                PipelineOutcome::Failed { error: message }
            }
        }
    }

    async fn execute(
        &self,
        job: &AnalysisJob,
        cancel: &CancellationToken,
        started: Instant,
    ) -> AppResult<(String, &'static str)> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let current = self
            .analyses
            .get(&job.id)
            .await
            .ok_or_else(|| AppError::not_found(format!("Analysis {} not found", job.id)))?;

        // 1. 预处理
        let current = self
            .analyses
            .transition(current.with_stage(AnalysisStatus::PREPROCESS_PROGRESS, "Preprocessing image..."))
            .await?;
        pause(self.config.preprocess_delay(), cancel).await?;

        // 2. 推理
        let current = self
            .analyses
            .transition(current.with_stage(AnalysisStatus::INFER_PROGRESS, "AI analyzing X-ray patterns..."))
            .await?;

        let image = self.blob_store.load(&job.filename).await?;
        let mime_type = self.analyzer.detect_image_mime(&image, &job.filename);
        debug!(analysis_id = %job.id, mime_type, size = image.len(), "图像已读取");

        let request = VisionRequest::new(&job.original_name, mime_type, &image);
        let content = tokio::select! {
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            reply = self.vision.describe_image(&request) => reply?,
        };

        let outcome = parse_findings(&content);
        let parse_kind = outcome.kind();
        if parse_kind != "parsed" {
            warn!(analysis_id = %job.id, parse_kind, "模型回复未按约定格式返回");
        }

        // 3. 生成报告
        let current = self
            .analyses
            .transition(current.with_stage(AnalysisStatus::FINALIZE_PROGRESS, "Generating report..."))
            .await?;
        pause(self.config.finalize_delay(), cancel).await?;

        let report_id = DiagnosticReport::id_for(&job.id);
        let report = DiagnosticReport {
            id: report_id.clone(),
            timestamp: Utc::now(),
            image_url: current
                .image_url
                .clone()
                .unwrap_or_else(|| AnalysisStatus::image_url_for(&job.filename)),
            findings: outcome.into_findings(),
            metadata: ReportMetadata {
                image_type: image_type_of(&job.original_name),
                processing_time: started.elapsed().as_secs(),
                ai_model: self.model_display_name.clone(),
            },
        };

        // 报告先入库，再标记完成
        self.reports.insert(report).await?;
        self.analyses.transition(current.completed(&report_id)).await?;

        Ok((report_id, parse_kind))
    }

    async fn mark_failed(&self, id: &str, message: &str) {
        let Some(current) = self.analyses.get(id).await else {
            warn!(analysis_id = %id, "分析记录不存在，无法写入失败状态");
            return;
        };
        if current.is_terminal() {
            return;
        }
        if let Err(e) = self.analyses.transition(current.failed(message)).await {
            warn!(analysis_id = %id, error = %e, "写入失败状态出错");
        }
    }
}

/// 可取消的阶段等待
async fn pause(delay: Duration, cancel: &CancellationToken) -> AppResult<()> {
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisState;
    use crate::services::vision_mock::{FailingVisionClient, StaticVisionClient};
    use crate::storage::LocalBlobStore;
    use tempfile::TempDir;

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    struct Fixture {
        _dir: TempDir,
        pipeline: AnalysisPipeline,
        analyses: AnalysisRepository,
        reports: ReportRepository,
    }

    async fn fixture(vision: Arc<dyn VisionClient>, config: PipelineConfig) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        store.save("a1.png", PNG_BYTES).await.unwrap();

        let analyses = AnalysisRepository::in_memory();
        let reports = ReportRepository::in_memory();
        analyses
            .create(AnalysisStatus::started("a1", AnalysisStatus::image_url_for("a1.png")))
            .await
            .unwrap();

        let pipeline = AnalysisPipeline::new(
            Arc::new(store),
            vision,
            analyses.clone(),
            reports.clone(),
            config,
            "Test Vision Model",
        );

        Fixture {
            _dir: dir,
            pipeline,
            analyses,
            reports,
        }
    }

    fn job() -> AnalysisJob {
        AnalysisJob {
            id: "a1".to_string(),
            filename: "a1.png".to_string(),
            original_name: "Chest.PNG".to_string(),
        }
    }

    #[tokio::test]
    async fn test_successful_run_produces_report() {
        let fx = fixture(
            Arc::new(StaticVisionClient::well_formed()),
            PipelineConfig::immediate(),
        )
        .await;

        let outcome = fx.pipeline.run(&job(), &CancellationToken::new()).await;
        assert_eq!(
            outcome,
            PipelineOutcome::Completed {
                report_id: "report_a1".to_string(),
                parse_kind: "parsed",
            }
        );

        let status = fx.analyses.get("a1").await.unwrap();
        assert_eq!(status.status, AnalysisState::Completed);
        assert_eq!(status.progress, 100);
        assert_eq!(status.report_id.as_deref(), Some("report_a1"));

        let report = fx.reports.get("report_a1").await.unwrap();
        assert_eq!(report.image_url, "/api/images/a1.png");
        assert_eq!(report.findings.confidence, 88);
        assert_eq!(report.metadata.image_type, "PNG");
        assert_eq!(report.metadata.ai_model, "Test Vision Model");
    }

    #[tokio::test]
    async fn test_upstream_failure_marks_error_without_report() {
        let fx = fixture(
            Arc::new(FailingVisionClient::internal_error()),
            PipelineConfig::immediate(),
        )
        .await;

        let outcome = fx.pipeline.run(&job(), &CancellationToken::new()).await;
        assert!(!outcome.is_completed());

        let status = fx.analyses.get("a1").await.unwrap();
        assert_eq!(status.status, AnalysisState::Error);
        assert_eq!(status.progress, 0);
        assert_eq!(
            status.error.as_deref(),
            Some("AI analysis failed: Internal Server Error")
        );
        assert!(status.report_id.is_none());
        assert_eq!(fx.reports.count().await, 0);
    }

    #[tokio::test]
    async fn test_reply_without_json_still_completes() {
        let fx = fixture(
            Arc::new(StaticVisionClient::new("Looks like a normal chest film.")),
            PipelineConfig::immediate(),
        )
        .await;

        let outcome = fx.pipeline.run(&job(), &CancellationToken::new()).await;
        assert!(matches!(
            outcome,
            PipelineOutcome::Completed { parse_kind: "generic", .. }
        ));

        let report = fx.reports.get("report_a1").await.unwrap();
        assert_eq!(report.findings.confidence, 70);
    }

    #[tokio::test]
    async fn test_missing_image_fails_analysis() {
        let fx = fixture(
            Arc::new(StaticVisionClient::well_formed()),
            PipelineConfig::immediate(),
        )
        .await;

        let mut missing = job();
        missing.filename = "gone.png".to_string();
        let outcome = fx.pipeline.run(&missing, &CancellationToken::new()).await;

        assert!(!outcome.is_completed());
        let status = fx.analyses.get("a1").await.unwrap();
        assert_eq!(status.status, AnalysisState::Error);
        assert!(status.error.unwrap().contains("gone.png"));
    }

    #[tokio::test]
    async fn test_cancellation_marks_error() {
        let fx = fixture(
            Arc::new(StaticVisionClient::well_formed()),
            PipelineConfig::default(),
        )
        .await;

        let cancel = CancellationToken::new();
        let pipeline = fx.pipeline.clone();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { pipeline.run(&job(), &cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let outcome = handle.await.unwrap();
        assert_eq!(
            outcome,
            PipelineOutcome::Failed {
                error: "Analysis cancelled".to_string()
            }
        );
        let status = fx.analyses.get("a1").await.unwrap();
        assert_eq!(status.error.as_deref(), Some("Analysis cancelled"));
        assert_eq!(fx.reports.count().await, 0);
    }

    #[tokio::test]
    async fn test_progress_never_regresses() {
        let config = PipelineConfig {
            preprocess_delay_ms: 30,
            finalize_delay_ms: 30,
            ..PipelineConfig::default()
        };
        let vision = StaticVisionClient::well_formed().with_delay(Duration::from_millis(30));
        let fx = fixture(Arc::new(vision), config).await;

        let analyses = fx.analyses.clone();
        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            loop {
                let status = analyses.get("a1").await.unwrap();
                let done = status.is_terminal();
                seen.push(status);
                if done {
                    return seen;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        fx.pipeline.run(&job(), &CancellationToken::new()).await;
        let seen = watcher.await.unwrap();

        for pair in seen.windows(2) {
            assert!(pair[1].progress >= pair[0].progress);
            assert!(pair[0].status.can_advance_to(pair[1].status));
        }
        let progresses: Vec<u8> = seen.iter().map(|s| s.progress).collect();
        assert!(progresses.contains(&30));
        assert!(progresses.contains(&60));
        assert!(progresses.contains(&90));
        assert_eq!(seen.last().unwrap().progress, 100);
    }
}
