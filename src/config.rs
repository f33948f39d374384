use crate::error::{AppResult, ConfigError};

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次请求超时（秒），超时按批次失败处理
    pub llm_request_timeout_secs: u64,
    /// 单次请求的最大输出 token 数
    pub llm_max_tokens: u32,
    /// 自定义考纲 TOML 文件，为空时使用内置考纲
    pub syllabus_file: Option<String>,
    /// 输出日志文件
    pub output_log_file: String,
    /// 生成结果（JSON）输出目录
    pub output_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai"
                .to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            llm_request_timeout_secs: 120,
            llm_max_tokens: 8192,
            syllabus_file: None,
            output_log_file: "output.txt".to_string(),
            output_dir: "output".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL")
                .unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_request_timeout_secs: env_parse(
                "LLM_REQUEST_TIMEOUT_SECS",
                default.llm_request_timeout_secs,
            ),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", default.llm_max_tokens),
            syllabus_file: std::env::var("SYLLABUS_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or(default.syllabus_file),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging),
        }
    }

    /// 检查必填项
    pub fn validate(&self) -> AppResult<()> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "LLM_API_KEY".to_string(),
            }
            .into());
        }
        if self.llm_model_name.trim().is_empty() {
            return Err(ConfigError::EnvVarParseFailed {
                var_name: "LLM_MODEL_NAME".to_string(),
                value: self.llm_model_name.clone(),
                expected_type: "非空模型名称".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// 读取并解析环境变量，缺失或无法解析时使用默认值
fn env_parse<T: std::str::FromStr>(var_name: &str, default: T) -> T {
    std::env::var(var_name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
