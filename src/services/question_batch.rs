//! 出题批次服务 - 业务能力层
//!
//! 一次调用 = 向模型请求一批题目。任何失败（网络错误、非 JSON、缺少 `questions`、
//! 模型拒绝）都在这里吞掉并记录日志，调用方只会看到"零道或多道题目"。
//! 这一层不重试。

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppResult, ParseError};
use crate::models::{Document, QuestionItem, OPTION_COUNT};
use crate::services::backend::{CompletionRequest, GenerationBackend};
use crate::utils::{parse_tolerant, truncate_text};

/// 出题的采样温度
pub const QUESTION_TEMPERATURE: f32 = 0.8;

/// 单批次的生成请求，创建后不可修改
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    prompt: String,
    batch_size: usize,
    document: Option<Document>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, batch_size: usize, document: Option<Document>) -> Self {
        Self {
            prompt: prompt.into(),
            batch_size,
            document,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// 期望的题目数量，只用于提示词，不约束返回结果
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }
}

/// 出题批次服务
pub struct QuestionBatchService {
    backend: Arc<dyn GenerationBackend>,
}

impl QuestionBatchService {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// 请求一批题目，从不返回错误
    ///
    /// # 参数
    /// - `request`: 批次请求
    /// - `label`: 日志标识（哪个用例的第几批）
    pub async fn request_batch(
        &self,
        request: &GenerationRequest,
        label: &str,
    ) -> Vec<QuestionItem> {
        match self.try_request_batch(request).await {
            Ok(items) => {
                debug!(
                    "[{}] 批次返回 {} 道题目 (期望 {})",
                    label,
                    items.len(),
                    request.batch_size()
                );
                items
            }
            Err(e) => {
                warn!("[{}] ⚠️ 批次生成失败，按空批次处理: {}", label, e);
                Vec::new()
            }
        }
    }

    async fn try_request_batch(
        &self,
        request: &GenerationRequest,
    ) -> AppResult<Vec<QuestionItem>> {
        let completion = CompletionRequest::new(request.prompt())
            .with_document(request.document.clone())
            .with_schema(question_batch_schema())
            .with_temperature(QUESTION_TEMPERATURE);

        let raw = self.backend.complete(&completion).await?;
        debug!("批次原始响应: {}", truncate_text(&raw, 200));

        Ok(parse_batch(&raw)?)
    }
}

/// `{ questions: QuestionItem[] }` 的 JSON Schema
pub fn question_batch_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "question": { "type": "string" },
                        "options": {
                            "type": "array",
                            "items": { "type": "string" },
                            "minItems": OPTION_COUNT,
                            "maxItems": OPTION_COUNT
                        },
                        "correctAnswerIndex": { "type": "integer" },
                        "explanation": { "type": "string" }
                    },
                    "required": ["question", "options", "correctAnswerIndex", "explanation"]
                }
            }
        },
        "required": ["questions"]
    })
}

#[derive(Debug, Deserialize)]
struct RawBatch {
    questions: Vec<JsonValue>,
}

/// 宽松的单题结构
///
/// 每道题单独反序列化和校验，一道坏题不影响同批其他题。
/// 数字选项转为文本，下标接受 `1`、`1.0` 和 `"1"`。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(default)]
    question: String,
    #[serde(default)]
    options: Vec<JsonValue>,
    #[serde(default)]
    correct_answer_index: Option<JsonValue>,
    #[serde(default)]
    explanation: String,
}

impl RawQuestion {
    fn into_item(self) -> Result<QuestionItem, String> {
        if self.question.trim().is_empty() {
            return Err("题干为空".to_string());
        }
        if self.options.len() != OPTION_COUNT {
            return Err(format!("选项数量为 {}", self.options.len()));
        }
        let options = self
            .options
            .iter()
            .map(option_text)
            .collect::<Option<Vec<String>>>()
            .ok_or_else(|| "选项不是文本或数字".to_string())?;

        let raw_index = self
            .correct_answer_index
            .ok_or_else(|| "缺少正确答案下标".to_string())?;
        let index = answer_index(&raw_index)
            .filter(|i| *i < options.len())
            .ok_or_else(|| format!("正确答案下标 {} 不合法", raw_index))?;

        Ok(QuestionItem {
            question: self.question,
            options,
            correct_answer_index: index,
            explanation: self.explanation,
        })
    }
}

fn option_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn answer_index(value: &JsonValue) -> Option<usize> {
    match value {
        JsonValue::Number(n) => match n.as_u64() {
            Some(i) => usize::try_from(i).ok(),
            None => n
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as usize),
        },
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 解析并校验一批题目
pub(crate) fn parse_batch(raw: &str) -> Result<Vec<QuestionItem>, ParseError> {
    let batch: RawBatch = parse_tolerant(raw).map_err(|e| ParseError::JsonParseFailed {
        context: "questions".to_string(),
        source: e,
    })?;

    let items = batch
        .questions
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| {
            let item = serde_json::from_value::<RawQuestion>(value)
                .map_err(|e| e.to_string())
                .and_then(RawQuestion::into_item);
            match item {
                Ok(item) => Some(item),
                Err(reason) => {
                    warn!("丢弃第 {} 道不合格题目: {}", i + 1, reason);
                    None
                }
            }
        })
        .collect();

    Ok(items)
}
