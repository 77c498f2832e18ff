use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 分析状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisState {
    /// 上传中
    Uploading,
    /// 分析中
    Analyzing,
    /// 已完成
    Completed,
    /// 失败
    Error,
}

impl AnalysisState {
    /// 是否为终态
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// 状态推进顺序，终态共享同一级
    fn rank(self) -> u8 {
        match self {
            Self::Uploading => 0,
            Self::Analyzing => 1,
            Self::Completed | Self::Error => 2,
        }
    }

    /// 是否允许从当前状态迁移到目标状态
    pub fn can_advance_to(self, next: AnalysisState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() >= self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分析状态记录（客户端轮询的唯一数据源）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatus {
    /// 分析ID（上传时分配）
    pub id: String,
    /// 当前状态
    pub status: AnalysisState,
    /// 进度（0-100）
    pub progress: u8,
    /// 当前阶段描述
    pub message: String,
    /// 图像访问地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// 报告ID（仅在完成时设置）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
    /// 错误信息（仅在失败时设置）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisStatus {
    pub const START_PROGRESS: u8 = 10;
    pub const PREPROCESS_PROGRESS: u8 = 30;
    pub const INFER_PROGRESS: u8 = 60;
    pub const FINALIZE_PROGRESS: u8 = 90;
    pub const COMPLETE_PROGRESS: u8 = 100;

    /// 图像访问路径前缀
    pub const IMAGE_ROUTE_PREFIX: &'static str = "/api/images/";

    /// 存储文件名对应的图像地址
    pub fn image_url_for(filename: &str) -> String {
        format!("{}{}", Self::IMAGE_ROUTE_PREFIX, filename)
    }

    /// 创建初始分析记录
    pub fn started(id: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: AnalysisState::Analyzing,
            progress: Self::START_PROGRESS,
            message: "Starting AI analysis...".to_string(),
            image_url: Some(image_url.into()),
            report_id: None,
            error: None,
        }
    }

    /// 推进到新的阶段（保持状态为分析中）
    pub fn with_stage(&self, progress: u8, message: impl Into<String>) -> Self {
        Self {
            progress,
            message: message.into(),
            ..self.clone()
        }
    }

    /// 标记为完成
    pub fn completed(&self, report_id: impl Into<String>) -> Self {
        Self {
            status: AnalysisState::Completed,
            progress: Self::COMPLETE_PROGRESS,
            message: "Analysis completed successfully".to_string(),
            report_id: Some(report_id.into()),
            error: None,
            ..self.clone()
        }
    }

    /// 标记为失败
    pub fn failed(&self, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            status: AnalysisState::Error,
            progress: 0,
            message: "Analysis failed".to_string(),
            report_id: None,
            error: Some(if error.trim().is_empty() {
                "Unknown error occurred".to_string()
            } else {
                error
            }),
            ..self.clone()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// 启动分析请求
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartAnalysisRequest {
    /// 分析ID
    #[serde(default)]
    pub id: Option<String>,
    /// 存储文件名
    #[serde(default)]
    pub filename: Option<String>,
    /// 原始文件名
    #[serde(default)]
    pub original_name: Option<String>,
}

/// 分析状态查询参数
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnalysisQuery {
    pub id: Option<String>,
}
