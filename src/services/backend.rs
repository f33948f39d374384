//! 生成服务接口 - 业务能力层与外部模型之间的边界
//!
//! 编排层和用例层只依赖 `GenerationBackend`，真实实现是 [`LlmService`]，
//! 测试中替换为脚本化的假实现。
//!
//! [`LlmService`]: crate::services::LlmService

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppResult;
use crate::models::Document;

/// 默认采样温度
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// 一次模型调用的全部输入
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_message: Option<String>,
    pub user_message: String,
    /// 可选附件（如 PDF），与文本一起发送
    pub document: Option<Document>,
    /// 要求模型按此 JSON Schema 输出
    pub response_schema: Option<JsonValue>,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            system_message: None,
            user_message: user_message.into(),
            document: None,
            response_schema: None,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_system(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }

    pub fn with_document(mut self, document: Option<Document>) -> Self {
        self.document = document;
        self
    }

    pub fn with_schema(mut self, schema: JsonValue) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// 外部生成服务
///
/// 返回模型的原始文本；结构化结果由调用方自行解析。
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> AppResult<String>;
}
