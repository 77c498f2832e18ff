pub mod analyzer;
pub mod hasher;
pub mod validator;

pub use analyzer::FileAnalyzer;
pub use hasher::FileHasher;
pub use validator::FileValidator;

use crate::{config::FileConfig, error::AppResult};

/// 上传文件处理结果
#[derive(Debug, Clone)]
pub struct ProcessedUpload {
    /// 原始文件名
    pub original_name: String,
    /// 存储文件名（<ID>.<扩展名>）
    pub storage_filename: String,
    /// 文件大小（字节）
    pub size: u64,
    /// 客户端声明的MIME类型
    pub declared_type: String,
    /// 文件头识别出的MIME类型
    pub detected_type: &'static str,
    /// SHA256摘要
    pub sha256: String,
}

/// 文件处理配置
#[derive(Debug, Clone)]
pub struct FileProcessingConfig {
    /// 最大文件大小（字节）
    pub max_file_size: u64,
    /// 支持的文件类型
    pub allowed_mime_types: Vec<String>,
    /// DICOM 扩展名
    pub dicom_extension: String,
}

impl Default for FileProcessingConfig {
    fn default() -> Self {
        FileConfig::default().into()
    }
}

impl From<FileConfig> for FileProcessingConfig {
    fn from(config: FileConfig) -> Self {
        Self {
            max_file_size: config.max_size,
            allowed_mime_types: config.allowed_mime_types,
            dicom_extension: config.dicom_extension,
        }
    }
}

/// 文件处理器主接口
pub struct FileProcessor {
    config: FileProcessingConfig,
    analyzer: FileAnalyzer,
    hasher: FileHasher,
    validator: FileValidator,
}

impl std::fmt::Debug for FileProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileProcessor")
            .field("config", &self.config)
            .finish()
    }
}

impl Clone for FileProcessor {
    fn clone(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl FileProcessor {
    /// 创建新的文件处理器
    pub fn new(config: FileProcessingConfig) -> Self {
        Self {
            analyzer: FileAnalyzer::new(),
            hasher: FileHasher::new(),
            validator: FileValidator::new(&config),
            config,
        }
    }

    /// 处理一次上传：验证、生成存储文件名、识别类型、计算摘要
    pub async fn process_upload(
        &self,
        id: &str,
        file_data: &[u8],
        filename: &str,
        declared_type: &str,
    ) -> AppResult<ProcessedUpload> {
        // 1. 验证文件
        self.validator
            .validate_upload(file_data, filename, declared_type)?;

        // 2. 分析文件基本信息
        let storage_filename = self.analyzer.storage_filename(id, filename);
        let detected_type = self.analyzer.detect_image_mime(file_data, filename);

        // 3. 计算文件摘要
        let sha256 = self.hasher.sha256(file_data).await?;

        Ok(ProcessedUpload {
            original_name: filename.to_string(),
            storage_filename,
            size: file_data.len() as u64,
            declared_type: declared_type.to_string(),
            detected_type,
            sha256,
        })
    }
}
