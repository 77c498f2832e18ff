use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod inference;
pub mod pipeline;

pub use inference::InferenceConfig;
pub use pipeline::PipelineConfig;

/// 应用程序配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub file: FileConfig,
    pub inference: InferenceConfig,
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 本地存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 上传文件保存目录
    pub upload_dir: String,
}

/// 文件上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub max_size: u64,
    pub allowed_mime_types: Vec<String>,
    /// 无论声明的MIME类型如何都接受的扩展名（DICOM）
    pub dicom_extension: String,
}

/// 命令行客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub redirect_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            poll_interval_ms: 2000,
            redirect_delay_ms: 2000,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            max_size: 10 * 1024 * 1024, // 10MB
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
                "image/png".to_string(),
                "application/dicom".to_string(),
            ],
            dicom_extension: ".dcm".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                upload_dir: "uploads".to_string(),
            },
            file: FileConfig::default(),
            inference: InferenceConfig::default(),
            pipeline: PipelineConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| AppError::config(format!("解析配置文件失败: {}", e)))?;

        config.inference.apply_env_overrides();

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> AppResult<()> {
        if self.server.port == 0 {
            return Err(AppError::config("服务器端口不能为0"));
        }

        if self.storage.upload_dir.trim().is_empty() {
            return Err(AppError::config("上传目录不能为空"));
        }

        if self.file.max_size == 0 {
            return Err(AppError::config("文件最大大小不能为0"));
        }

        if let Err(e) = self.inference.validate() {
            return Err(AppError::config(format!("推理服务配置无效: {}", e)));
        }

        if let Err(e) = self.pipeline.validate() {
            return Err(AppError::config(format!("流水线配置无效: {}", e)));
        }

        Ok(())
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.upload_dir)
    }

    /// 请求体上限：文件上限加上 multipart 编码开销
    pub fn body_limit(&self) -> usize {
        (self.file.max_size as usize).saturating_add(2 * 1024 * 1024)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> AppResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::config(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}
