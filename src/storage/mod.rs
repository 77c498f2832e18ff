pub mod local;

pub use local::LocalBlobStore;

use crate::error::AppResult;
use bytes::Bytes;

/// 图像存储抽象接口
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// 保存文件，返回写入的字节数
    async fn save(&self, key: &str, data: &[u8]) -> AppResult<u64>;

    /// 读取文件
    async fn load(&self, key: &str) -> AppResult<Bytes>;

    /// 获取文件信息
    async fn get_metadata(&self, key: &str) -> AppResult<BlobMetadata>;
}

/// 文件元数据
#[derive(Debug, Clone)]
pub struct BlobMetadata {
    pub size: u64,
    pub content_type: &'static str,
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// 根据扩展名推断内容类型
pub fn content_type_for(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("dcm") => "application/dicom",
        _ => "application/octet-stream",
    }
}

/// 存储键只允许单层文件名
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && !key.contains("..")
        && !key.contains(['/', '\\', '\0'])
}
