use super::{BlobMetadata, BlobStore, content_type_for, is_valid_key};
use crate::error::{AppError, AppResult};
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;

/// 本地文件系统存储实现
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// 创建新的本地存储实例（目录在首次写入时创建）
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 确保存储目录存在
    pub async fn ensure_root(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Storage(format!("创建上传目录失败: {}", e)))?;
        tracing::debug!("上传目录已就绪: {}", self.root.display());
        Ok(())
    }

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        if !is_valid_key(key) {
            return Err(AppError::file_not_found(key));
        }
        Ok(self.root.join(key))
    }

    /// 健康检查
    pub async fn health_check(&self) -> AppResult<bool> {
        match fs::metadata(&self.root).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) => {
                tracing::warn!("上传目录不可用: {}", e);
                Ok(false)
            }
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, key: &str, data: &[u8]) -> AppResult<u64> {
        let path = self
            .path_for(key)
            .map_err(|_| AppError::storage(format!("非法的存储文件名: {}", key)))?;

        // 确保目录存在
        self.ensure_root().await?;

        fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("写入文件失败: {}", e)))?;

        tracing::info!("成功保存文件: {} ({} 字节)", path.display(), data.len());
        Ok(data.len() as u64)
    }

    async fn load(&self, key: &str) -> AppResult<Bytes> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::file_not_found(key))
            }
            Err(e) => Err(AppError::Storage(format!("读取文件失败: {}", e))),
        }
    }

    async fn get_metadata(&self, key: &str) -> AppResult<BlobMetadata> {
        let path = self.path_for(key)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::file_not_found(key));
            }
            Err(e) => return Err(AppError::Storage(format!("获取文件元数据失败: {}", e))),
        };

        Ok(BlobMetadata {
            size: meta.len(),
            content_type: content_type_for(key),
            last_modified: meta.modified().ok().map(chrono::DateTime::<chrono::Utc>::from),
        })
    }
}
