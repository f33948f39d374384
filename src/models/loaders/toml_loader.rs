use crate::error::{AppError, AppResult, FileError};
use crate::models::syllabus::SyllabusCatalog;
use std::path::Path;
use tokio::fs;

/// 内置考纲（编译期嵌入）
const BUILTIN_SYLLABUS: &str = include_str!("../../../data/syllabus.toml");

/// 解析内置考纲
pub fn builtin_syllabus() -> AppResult<SyllabusCatalog> {
    parse_syllabus(BUILTIN_SYLLABUS, "<builtin>")
}

/// 从 TOML 文件加载考纲
pub async fn load_syllabus(toml_file_path: &Path) -> AppResult<SyllabusCatalog> {
    if !toml_file_path.exists() {
        return Err(FileError::NotFound {
            path: toml_file_path.display().to_string(),
        }
        .into());
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(toml_file_path.display().to_string(), e))?;

    let catalog = parse_syllabus(&content, &toml_file_path.display().to_string())?;

    tracing::info!(
        "成功加载考纲 {}: {} 个科目",
        toml_file_path.file_name().unwrap_or_default().to_string_lossy(),
        catalog.subjects.len()
    );

    Ok(catalog)
}

/// 有自定义路径时加载文件，否则使用内置考纲
pub async fn load_syllabus_or_builtin(path: Option<&str>) -> AppResult<SyllabusCatalog> {
    match path {
        Some(p) => load_syllabus(Path::new(p)).await,
        None => builtin_syllabus(),
    }
}

fn parse_syllabus(content: &str, path: &str) -> AppResult<SyllabusCatalog> {
    toml::from_str(content).map_err(|e| {
        FileError::TomlParseFailed {
            path: path.to_string(),
            source: Box::new(e),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_syllabus_has_all_exams() {
        let catalog = builtin_syllabus().unwrap();
        assert_eq!(catalog.subjects.len(), 4);

        let usfq = catalog.subject("Examen de Admisión - USFQ").unwrap();
        assert_eq!(usfq.topics.len(), 3);
        assert!(usfq.sub_topic_count() > 0);
    }

    #[test]
    fn test_parse_error_carries_path() {
        let err = parse_syllabus("[[subjects]]\nname = 3", "broken.toml").unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = load_syllabus(Path::new("no_such_syllabus.toml")).await;
        assert!(matches!(
            result,
            Err(AppError::File(FileError::NotFound { .. }))
        ));
    }
}
