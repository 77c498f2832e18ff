use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 环境变量：覆盖配置文件中的推理服务密钥
pub const API_KEY_ENV: &str = "XRAY_INFERENCE_API_KEY";

/// 视觉推理服务配置（OpenAI 兼容 chat/completions 接口）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// chat/completions 完整地址
    pub endpoint: String,
    /// Bearer 凭证
    pub api_key: String,
    /// 请求中使用的模型ID
    pub model: String,
    /// 写入报告元数据的模型名称
    pub model_display_name: String,
    /// 单次推理请求超时（秒）
    pub timeout_secs: u64,
    /// 额外的固定请求头
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://oi-server.onrender.com/chat/completions".to_string(),
            api_key: String::new(),
            model: "openrouter/anthropic/claude-sonnet-4".to_string(),
            model_display_name: "Claude Sonnet 4 (Vision)".to_string(),
            timeout_secs: 120,
            extra_headers: HashMap::new(),
        }
    }
}

impl InferenceConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_empty() {
            return Err("推理服务 endpoint 不能为空".to_string());
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err("推理服务 endpoint 必须以 http:// 或 https:// 开头".to_string());
        }

        if self.model.trim().is_empty() {
            return Err("模型ID不能为空".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("推理超时必须大于0".to_string());
        }

        Ok(())
    }

    /// 使用环境变量覆盖密钥
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = key;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(InferenceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let config = InferenceConfig {
            endpoint: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = InferenceConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
