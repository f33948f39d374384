//! 日志工具模块
//!
//! 提供日志初始化和格式化输出的辅助函数

use crate::error::{AppError, AppResult};
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志（`RUST_LOG` 未设置时默认 info）
///
/// 重复调用是安全的，第二次起直接忽略。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n学习题目生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(model_name: &str, api_base_url: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量并发出题模式");
    info!("🤖 模型: {}", model_name);
    info!("🌐 接口: {}", api_base_url);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `label`: 生成任务名称
/// - `obtained`: 实际得到的题目数
/// - `total`: 目标题目数
/// - `output_path`: 结果文件路径
pub fn print_final_stats(label: &str, obtained: usize, total: usize, output_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 {} 生成完成", label);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 题目: {}/{}", obtained, total);
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", output_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
