use serde::{Deserialize, Serialize};

/// 考纲目录（多个考试科目）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusCatalog {
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

/// 一个考试科目，如 "Examen de Admisión - USFQ"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub sub_topics: Vec<String>,
}

impl SyllabusCatalog {
    /// 按名称查找科目（忽略大小写和首尾空白）
    ///
    /// 先精确匹配，再按名称片段匹配，如 `"usfq"` 命中 "Examen de Admisión - USFQ"
    pub fn subject(&self, name: &str) -> Option<&Subject> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let needle = name.to_lowercase();
        self.subjects
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .or_else(|| {
                self.subjects
                    .iter()
                    .find(|s| s.name.to_lowercase().contains(&needle))
            })
    }

    /// 查找子主题所属的 (科目, 主题)
    pub fn locate_sub_topic(&self, sub_topic: &str) -> Option<(&Subject, &Topic)> {
        let sub_topic = sub_topic.trim();
        self.subjects.iter().find_map(|subject| {
            subject
                .topics
                .iter()
                .find(|t| t.sub_topics.iter().any(|s| s == sub_topic))
                .map(|topic| (subject, topic))
        })
    }
}

impl Subject {
    pub fn sub_topic_count(&self) -> usize {
        self.topics.iter().map(|t| t.sub_topics.len()).sum()
    }

    /// 考纲大纲文本，嵌入模拟考试的提示词
    ///
    /// ```text
    ///   - Topic:
    ///     - SubTopic
    /// ```
    pub fn outline(&self) -> String {
        self.topics
            .iter()
            .map(|topic| {
                let subs = topic
                    .sub_topics
                    .iter()
                    .map(|sub| format!("    - {}", sub))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("  - {}:\n{}", topic.name, subs)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
