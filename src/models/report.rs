use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 诊断发现
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Findings {
    /// 临床概述
    pub overview: String,
    /// 详细发现（有序）
    pub detailed: Vec<String>,
    /// 建议（有序）
    pub recommendations: Vec<String>,
    /// 置信度（0-100）
    pub confidence: u8,
}

/// 报告元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// 图像类型（原始扩展名大写）
    pub image_type: String,
    /// 处理耗时（秒）
    pub processing_time: u64,
    /// 使用的AI模型
    pub ai_model: String,
}

/// 诊断报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    /// 报告ID（report_<分析ID>）
    pub id: String,
    /// 创建时间
    pub timestamp: DateTime<Utc>,
    /// 图像访问地址
    pub image_url: String,
    pub findings: Findings,
    pub metadata: ReportMetadata,
}

impl DiagnosticReport {
    pub const ID_PREFIX: &'static str = "report_";

    /// 根据分析ID生成报告ID
    pub fn id_for(analysis_id: &str) -> String {
        format!("{}{}", Self::ID_PREFIX, analysis_id)
    }
}

/// 从原始文件名推导图像类型
pub fn image_type_of(original_name: &str) -> String {
    original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}
