//! 附件上传前的本地校验

use crate::im::error::AttachmentError;
use serde::{Deserialize, Serialize};

/// 待上传的附件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentUpload {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// 本地文件路径或平台提供的资源地址，由 SDK 负责读取
    pub url: String,
}

/// 渠道的文件限制
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileRestrictions {
    pub attachments_enabled: bool,
    /// 单个文件大小上限（MB）
    pub allowed_file_size_mb: u64,
    /// 允许的 MIME 类型，支持 `image/*` 这样的通配
    pub allowed_mime_types: Vec<String>,
}

impl Default for FileRestrictions {
    fn default() -> Self {
        Self {
            attachments_enabled: true,
            allowed_file_size_mb: 40,
            allowed_mime_types: vec![
                "image/*".to_string(),
                "video/*".to_string(),
                "audio/*".to_string(),
                "application/pdf".to_string(),
            ],
        }
    }
}

impl FileRestrictions {
    pub fn size_limit_bytes(&self) -> u64 {
        self.allowed_file_size_mb.saturating_mul(1024 * 1024)
    }

    fn allows_mime_type(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        self.allowed_mime_types.iter().any(|pattern| {
            let pattern = pattern.trim().to_ascii_lowercase();
            match pattern.strip_suffix("/*") {
                Some(prefix) => mime_type
                    .split_once('/')
                    .is_some_and(|(kind, _)| kind == prefix),
                None => pattern == "*/*" || pattern == mime_type,
            }
        })
    }

    /// 校验单个附件
    pub fn validate(&self, upload: &AttachmentUpload) -> Result<(), AttachmentError> {
        if !self.attachments_enabled {
            return Err(AttachmentError::AttachmentsDisabled);
        }
        let limit_bytes = self.size_limit_bytes();
        if upload.size_bytes > limit_bytes {
            return Err(AttachmentError::TooLarge {
                file_name: upload.file_name.clone(),
                size_bytes: upload.size_bytes,
                limit_bytes,
            });
        }
        if !self.allows_mime_type(&upload.mime_type) {
            return Err(AttachmentError::UnsupportedType {
                mime_type: upload.mime_type.clone(),
            });
        }
        Ok(())
    }

    /// 校验一批附件，返回第一个错误
    pub fn validate_all(&self, uploads: &[AttachmentUpload]) -> Result<(), AttachmentError> {
        uploads.iter().try_for_each(|upload| self.validate(upload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(mime_type: &str, size_bytes: u64) -> AttachmentUpload {
        AttachmentUpload {
            file_name: "file".to_string(),
            mime_type: mime_type.to_string(),
            size_bytes,
            url: "file:///tmp/file".to_string(),
        }
    }

    #[test]
    fn wildcard_and_exact_types() {
        let restrictions = FileRestrictions::default();
        assert!(restrictions.validate(&upload("image/png", 10)).is_ok());
        assert!(restrictions.validate(&upload("IMAGE/HEIC", 10)).is_ok());
        assert!(restrictions.validate(&upload("application/pdf", 10)).is_ok());
        assert_eq!(
            restrictions.validate(&upload("application/zip", 10)),
            Err(AttachmentError::UnsupportedType {
                mime_type: "application/zip".to_string()
            })
        );
        assert!(restrictions.validate(&upload("imagepng", 10)).is_err());
    }

    #[test]
    fn size_limit_is_inclusive() {
        let restrictions = FileRestrictions {
            allowed_file_size_mb: 1,
            ..FileRestrictions::default()
        };
        assert!(restrictions.validate(&upload("image/png", 1024 * 1024)).is_ok());
        assert!(matches!(
            restrictions.validate(&upload("image/png", 1024 * 1024 + 1)),
            Err(AttachmentError::TooLarge { .. })
        ));
    }

    #[test]
    fn disabled_attachments_reject_everything() {
        let restrictions = FileRestrictions {
            attachments_enabled: false,
            ..FileRestrictions::default()
        };
        assert_eq!(
            restrictions.validate_all(&[upload("image/png", 1)]),
            Err(AttachmentError::AttachmentsDisabled)
        );
        assert!(restrictions.validate_all(&[]).is_ok());
    }
}
