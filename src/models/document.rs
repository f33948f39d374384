//! 附加文档（如 PDF），随生成请求一并发送给模型作为出题依据

use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{AppError, AppResult, FileError};

/// 二进制文档附件
///
/// 内容用 `Arc` 共享，同一份文档会被多个并发批次引用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub mime_type: String,
    data: Arc<[u8]>,
}

impl Document {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn pdf(data: impl Into<Arc<[u8]>>) -> Self {
        Self::new("application/pdf", data)
    }

    /// 从磁盘读取文档，MIME 类型按扩展名推断
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(FileError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        Ok(Self::new(mime_type_for(path), data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `data:<mime>;base64,<payload>` 形式，用于内联到消息内容中
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.data))
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        _ => "application/pdf",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        let doc = Document::pdf(b"%PDF".to_vec());
        assert_eq!(doc.to_data_url(), "data:application/pdf;base64,JVBERg==");
        assert_eq!(doc.len(), 4);
    }

    #[test]
    fn test_mime_type_by_extension() {
        assert_eq!(mime_type_for(Path::new("temario.PDF")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("foto.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("sin_extension")), "application/pdf");
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let err = Document::from_path(Path::new("no/existe.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::File(FileError::NotFound { .. })));
    }
}
