use super::{KeyValueStore, MemoryStore};
use crate::{
    error::{AppError, AppResult},
    models::DiagnosticReport,
};
use std::sync::Arc;

/// 诊断报告仓库（报告写入后不可变）
#[derive(Debug, Clone)]
pub struct ReportRepository {
    store: Arc<dyn KeyValueStore<DiagnosticReport>>,
}

impl ReportRepository {
    pub fn new(store: Arc<dyn KeyValueStore<DiagnosticReport>>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// 保存报告，同一ID只能写入一次
    pub async fn insert(&self, report: DiagnosticReport) -> AppResult<()> {
        let id = report.id.clone();
        if self.store.insert_if_absent(&id, report).await {
            tracing::info!(report_id = %id, "报告已保存");
            Ok(())
        } else {
            Err(AppError::conflict(format!("Report {} already exists", id)))
        }
    }

    pub async fn get(&self, id: &str) -> Option<DiagnosticReport> {
        self.store.get(id).await
    }

    pub async fn count(&self) -> usize {
        self.store.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Findings, ReportMetadata};

    fn report(id: &str) -> DiagnosticReport {
        DiagnosticReport {
            id: id.to_string(),
            timestamp: chrono::Utc::now(),
            image_url: "/api/images/a.png".to_string(),
            findings: Findings {
                overview: "ok".to_string(),
                detailed: vec!["d".to_string()],
                recommendations: vec!["r".to_string()],
                confidence: 80,
            },
            metadata: ReportMetadata {
                image_type: "PNG".to_string(),
                processing_time: 3,
                ai_model: "test".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = ReportRepository::in_memory();
        repo.insert(report("report_a")).await.unwrap();

        let found = repo.get("report_a").await.unwrap();
        assert_eq!(found.findings.confidence, 80);
        assert!(repo.get("report_missing").await.is_none());
    }

    #[tokio::test]
    async fn test_reports_are_immutable() {
        let repo = ReportRepository::in_memory();
        repo.insert(report("report_a")).await.unwrap();

        let mut changed = report("report_a");
        changed.findings.confidence = 1;
        assert!(repo.insert(changed).await.is_err());
        assert_eq!(repo.get("report_a").await.unwrap().findings.confidence, 80);
        assert_eq!(repo.count().await, 1);
    }
}
