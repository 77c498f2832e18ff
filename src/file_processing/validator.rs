use super::FileProcessingConfig;
use crate::error::{AppError, AppResult};

/// 上传文件验证器
pub struct FileValidator {
    config: FileProcessingConfig,
}

impl FileValidator {
    /// 创建新的文件验证器
    pub fn new(config: &FileProcessingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// 验证上传文件是否符合要求
    pub fn validate_upload(
        &self,
        file_data: &[u8],
        filename: &str,
        declared_mime: &str,
    ) -> AppResult<()> {
        // 1. 检查文件类型
        self.validate_file_type(declared_mime, filename)?;

        // 2. 检查文件大小
        self.validate_file_size(file_data.len() as u64)?;

        // 3. 检查文件名
        self.validate_filename(filename)?;

        Ok(())
    }

    /// 验证文件类型：声明的MIME在白名单内，或文件名以DICOM扩展名结尾
    pub fn validate_file_type(&self, declared_mime: &str, filename: &str) -> AppResult<()> {
        if self.is_allowed_mime(declared_mime) || self.has_dicom_extension(filename) {
            return Ok(());
        }

        let file_type = if declared_mime.is_empty() {
            "unknown"
        } else {
            declared_mime
        };
        Err(AppError::unsupported_file_type(file_type))
    }

    fn is_allowed_mime(&self, declared_mime: &str) -> bool {
        // 忽略参数部分，例如 "image/png; charset=binary"
        let essence = declared_mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        !essence.is_empty()
            && self
                .config
                .allowed_mime_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
    }

    fn has_dicom_extension(&self, filename: &str) -> bool {
        let extension = self.config.dicom_extension.to_ascii_lowercase();
        !extension.is_empty() && filename.to_ascii_lowercase().ends_with(&extension)
    }

    /// 验证文件大小
    pub fn validate_file_size(&self, file_size: u64) -> AppResult<()> {
        if file_size > self.config.max_file_size {
            return Err(AppError::file_too_large(self.config.max_file_size));
        }

        if file_size == 0 {
            return Err(AppError::Validation("File is empty".to_string()));
        }

        Ok(())
    }

    /// 验证文件名
    fn validate_filename(&self, filename: &str) -> AppResult<()> {
        if filename.trim().is_empty() {
            return Err(AppError::Validation("File name is required".to_string()));
        }

        // 检查文件名长度
        if filename.chars().count() > 255 {
            return Err(AppError::Validation(
                "File name is too long (max 255 characters)".to_string(),
            ));
        }

        // 检查危险字符
        if filename.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
            return Err(AppError::Validation(
                "File name contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_validator() -> FileValidator {
        FileValidator::new(&FileProcessingConfig::default())
    }

    #[test]
    fn test_validate_file_type() {
        let validator = create_validator();

        assert!(validator.validate_file_type("image/jpeg", "a.jpg").is_ok());
        assert!(validator.validate_file_type("image/jpg", "a.jpg").is_ok());
        assert!(validator.validate_file_type("IMAGE/PNG", "a.png").is_ok());
        assert!(validator.validate_file_type("application/dicom", "a").is_ok());

        // DICOM 扩展名不看声明类型
        assert!(validator.validate_file_type("application/octet-stream", "scan.DCM").is_ok());
        assert!(validator.validate_file_type("", "scan.dcm").is_ok());

        let err = validator.validate_file_type("text/plain", "notes.txt").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { .. }));
    }

    #[test]
    fn test_validate_file_size() {
        let validator = create_validator();

        assert!(validator.validate_file_size(0).is_err());
        assert!(validator.validate_file_size(512).is_ok());
        assert!(validator.validate_file_size(10 * 1024 * 1024).is_ok());

        let err = validator.validate_file_size(11 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, AppError::FileTooLarge { .. }));
    }

    #[test]
    fn test_validate_filename() {
        let validator = create_validator();

        assert!(validator.validate_filename("chest.png").is_ok());
        assert!(validator.validate_filename("").is_err());
        assert!(validator.validate_filename("../chest.png").is_err());
        assert!(validator.validate_filename("a\\b.png").is_err());
        assert!(validator.validate_filename(&"x".repeat(300)).is_err());
    }

    #[test]
    fn test_filename_limit_counts_characters() {
        let validator = create_validator();

        // 200 个汉字占 600 字节，仍在字符上限内
        let cjk = format!("{}.png", "胸".repeat(200));
        assert!(validator.validate_filename(&cjk).is_ok());

        let too_long = format!("{}.png", "胸".repeat(252));
        assert!(validator.validate_filename(&too_long).is_err());
    }

    #[test]
    fn test_type_is_checked_before_size() {
        let validator = create_validator();
        let data = vec![0u8; 11 * 1024 * 1024];

        let err = validator
            .validate_upload(&data, "notes.txt", "text/plain")
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { .. }));

        let err = validator
            .validate_upload(&data, "chest.png", "image/png")
            .unwrap_err();
        assert!(matches!(err, AppError::FileTooLarge { .. }));
    }
}
