use crate::error::{AppError, AppResult};
use sha2::{Digest, Sha256};
use tokio::task;

/// 文件摘要计算器
pub struct FileHasher;

impl FileHasher {
    /// 创建新的文件摘要计算器
    pub fn new() -> Self {
        Self
    }

    /// 在后台线程中计算SHA256，避免阻塞异步运行时
    pub async fn sha256(&self, data: &[u8]) -> AppResult<String> {
        let data = data.to_vec();
        task::spawn_blocking(move || Self::calculate_sha256(&data))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
    }

    /// 计算SHA256哈希值
    pub fn calculate_sha256(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

impl Default for FileHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sha256() {
        let hasher = FileHasher::new();
        let digest = hasher.sha256(b"abc").await.unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
