/// 图像类型分析器
#[derive(Debug, Clone, Copy)]
pub struct FileAnalyzer;

impl FileAnalyzer {
    /// 创建新的文件分析器
    pub fn new() -> Self {
        Self
    }

    /// 检测用于推理请求的图像MIME类型
    ///
    /// 优先使用文件头识别，无法识别时按扩展名回退：png、dcm 各自对应，其余按 JPEG 处理。
    pub fn detect_image_mime(&self, file_data: &[u8], filename: &str) -> &'static str {
        if let Some(kind) = infer::get(file_data) {
            match kind.mime_type() {
                "image/jpeg" | "image/png" | "application/dicom" => return kind.mime_type(),
                other => tracing::debug!("文件头识别为非预期类型: {}", other),
            }
        }

        match Self::extension_of(filename).as_deref() {
            Some("png") => "image/png",
            Some("dcm") => "application/dicom",
            _ => "image/jpeg",
        }
    }

    /// 提取小写扩展名
    ///
    /// 取最后一个 `.` 之后的部分，`.dcm` 这样只有扩展名的文件名也能识别。
    pub fn extension_of(filename: &str) -> Option<String> {
        filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// 生成存储文件名：<ID>.<扩展名>，缺少扩展名时使用 jpg
    pub fn storage_filename(&self, id: &str, original_name: &str) -> String {
        let extension = Self::extension_of(original_name).unwrap_or_else(|| "jpg".to_string());
        format!("{}.{}", id, extension)
    }
}

impl Default for FileAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
