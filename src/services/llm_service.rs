//! LLM 服务 - 业务能力层
//!
//! 只负责"调用模型"能力，不关心批次和流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点）

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, LlmError};
use crate::models::Document;
use crate::services::backend::{CompletionRequest, GenerationBackend};

const TOP_P: f32 = 0.95;

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API 完成一次生成
/// - 附件（PDF 等）以 data URL 内容块随文本发送
/// - 需要结构化输出时，在系统消息中声明 JSON Schema
/// - 不重试，不解析结果
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    max_tokens: u32,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> AppResult<Self> {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClientFailed {
                source: Box::new(e),
            })?;

        let client = Client::with_config(openai_config).with_http_client(http_client);

        Ok(Self {
            client,
            model_name: config.llm_model_name.clone(),
            max_tokens: config.llm_max_tokens,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `document`: 附件（可选），放在文本之前
    /// - `temperature`: 采样温度
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（已去掉首尾空白）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        document: Option<&Document>,
        temperature: f32,
    ) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = match document {
            Some(doc) => {
                debug!("包含附件: {} ({} 字节)", doc.mime_type, doc.len());

                let content_parts = vec![
                    ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: doc.to_data_url(),
                                detail: Some(ImageDetail::Auto),
                            },
                        },
                    ),
                    ChatCompletionRequestUserMessageContentPart::Text(
                        ChatCompletionRequestMessageContentPartText {
                            text: user_message.to_string(),
                        },
                    ),
                ];

                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(
                        content_parts,
                    ))
                    .build()?
            }
            None => ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()?,
        };

        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(temperature)
            .top_p(TOP_P)
            .max_tokens(self.max_tokens)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let choice = response
            .choices
            .first()
            .ok_or_else(|| LlmError::EmptyResponse {
                model: self.model_name.clone(),
            })?;

        let content = choice
            .message
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl GenerationBackend for LlmService {
    async fn complete(&self, request: &CompletionRequest) -> AppResult<String> {
        let system_message = build_system_message(request);
        self.send_to_llm(
            &request.user_message,
            system_message.as_deref(),
            request.document.as_ref(),
            request.temperature,
        )
        .await
    }
}

/// 合并系统消息与结构化输出声明
fn build_system_message(request: &CompletionRequest) -> Option<String> {
    let schema_note = request.response_schema.as_ref().map(|schema| {
        format!(
            "Responde ÚNICAMENTE con un objeto JSON válido que cumpla este JSON Schema, sin texto adicional ni bloques de código:\n{}",
            serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
        )
    });

    match (request.system_message.as_deref(), schema_note) {
        (Some(sys), Some(note)) => Some(format!("{}\n\n{}", sys, note)),
        (Some(sys), None) => Some(sys.to_string()),
        (None, Some(note)) => Some(note),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// 创建测试用的 LlmService
    fn create_test_service() -> LlmService {
        let config = Config {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or_else(|_| "test-key".to_string()),
            ..Config::default()
        };
        LlmService::new(&config).unwrap()
    }

    #[test]
    fn test_system_message_declares_schema() {
        let request = CompletionRequest::new("genera")
            .with_system("Eres un examinador.")
            .with_schema(json!({"type": "object", "required": ["questions"]}));

        let system = build_system_message(&request).unwrap();
        assert!(system.starts_with("Eres un examinador."));
        assert!(system.contains("\"required\""));
    }

    #[test]
    fn test_system_message_absent_without_inputs() {
        let request = CompletionRequest::new("hola");
        assert!(build_system_message(&request).is_none());
    }

    #[test]
    fn test_service_uses_configured_model() {
        let service = create_test_service();
        assert_eq!(service.model_name(), "gemini-2.5-flash");
    }

    /// 测试通用 LLM 调用
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_send_to_llm_simple -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_send_to_llm_simple() {
        let _ = tracing_subscriber::fmt::try_init();

        let service = create_test_service();

        let response = service
            .send_to_llm(
                "Explica en una frase qué es una ecuación lineal.",
                Some("Eres un tutor breve."),
                None,
                0.7,
            )
            .await;

        match response {
            Ok(text) => {
                println!("\n========== LLM 响应 ==========\n{}\n", text);
                assert!(!text.is_empty());
            }
            Err(e) => panic!("测试失败: {}", e),
        }
    }
}
