use super::{KeyValueStore, MemoryStore};
use crate::{
    error::{AppError, AppResult},
    models::{AnalysisState, AnalysisStatus},
};
use std::sync::Arc;

/// 分析状态仓库
///
/// 所有状态写入都经过生命周期校验：状态只前进不回退，非终态下进度不减少，
/// 终态记录不可再修改。
#[derive(Debug, Clone)]
pub struct AnalysisRepository {
    store: Arc<dyn KeyValueStore<AnalysisStatus>>,
}

impl AnalysisRepository {
    pub fn new(store: Arc<dyn KeyValueStore<AnalysisStatus>>) -> Self {
        Self { store }
    }

    /// 使用进程内存存储
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// 创建分析记录，ID 已存在时返回冲突
    pub async fn create(&self, status: AnalysisStatus) -> AppResult<()> {
        let id = status.id.clone();
        if self.store.insert_if_absent(&id, status).await {
            tracing::debug!(analysis_id = %id, "创建分析记录");
            Ok(())
        } else {
            Err(AppError::conflict(format!("Analysis {} already exists", id)))
        }
    }

    /// 查询分析记录
    pub async fn get(&self, id: &str) -> Option<AnalysisStatus> {
        self.store.get(id).await
    }

    /// 替换为下一条记录（校验状态迁移）
    pub async fn transition(&self, next: AnalysisStatus) -> AppResult<AnalysisStatus> {
        let id = next.id.clone();
        let updated = self
            .store
            .modify(&id, &|current| {
                validate_transition(current, &next)?;
                Ok(next.clone())
            })
            .await?;

        match updated {
            Some(status) => {
                tracing::debug!(
                    analysis_id = %id,
                    status = %status.status,
                    progress = status.progress,
                    "分析状态更新"
                );
                Ok(status)
            }
            None => Err(AppError::not_found(format!("Analysis {} not found", id))),
        }
    }

    pub async fn count(&self) -> usize {
        self.store.len().await
    }
}

/// 校验一次状态迁移是否合法
pub fn validate_transition(current: &AnalysisStatus, next: &AnalysisStatus) -> AppResult<()> {
    if current.id != next.id {
        return Err(AppError::validation("分析ID不可变更"));
    }

    if current.is_terminal() {
        return Err(AppError::conflict(format!(
            "Analysis {} is already {}",
            current.id, current.status
        )));
    }

    if !current.status.can_advance_to(next.status) {
        return Err(AppError::conflict(format!(
            "非法的状态迁移: {} -> {}",
            current.status, next.status
        )));
    }

    if current.image_url.is_some() && current.image_url != next.image_url {
        return Err(AppError::validation("图像地址只能设置一次"));
    }

    match next.status {
        AnalysisState::Completed => {
            if next.report_id.as_deref().is_none_or(str::is_empty) {
                return Err(AppError::validation("完成状态必须包含报告ID"));
            }
            if next.error.is_some() {
                return Err(AppError::validation("完成状态不能包含错误信息"));
            }
        }
        AnalysisState::Error => {
            if next.error.as_deref().is_none_or(str::is_empty) {
                return Err(AppError::validation("失败状态必须包含错误信息"));
            }
            if next.report_id.is_some() {
                return Err(AppError::validation("失败状态不能包含报告ID"));
            }
        }
        AnalysisState::Uploading | AnalysisState::Analyzing => {
            if next.progress < current.progress {
                return Err(AppError::conflict(format!(
                    "进度不能回退: {} -> {}",
                    current.progress, next.progress
                )));
            }
            if next.report_id.is_some() || next.error.is_some() {
                return Err(AppError::validation("非终态不能包含报告ID或错误信息"));
            }
        }
    }

    if next.progress > AnalysisStatus::COMPLETE_PROGRESS {
        return Err(AppError::validation("进度不能超过100"));
    }

    Ok(())
}
