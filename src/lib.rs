//! # Prep AI
//!
//! 面向大学入学考试的备考题目生成器：把"生成 N 道题"拆成多个批次并发请求模型，
//! 容忍部分批次失败，汇总后按完整度阈值决定成败。
//!
//! ## 架构设计
//!
//! ### ① 数据模型（Models）
//! - `models/` - 题目、题目集合、考纲树、文档附件、TOML 考纲加载
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每次只做一次模型调用
//! - `GenerationBackend` - 外部生成服务接口
//! - `LlmService` - 基于 async-openai 的实现
//! - `QuestionBatchService` - 请求一批题目，失败一律视为空批次
//! - `StudyAssistant` - 讲解、记忆卡片、学习计划、提示、错题分析
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_generator` - 批次拆分、并发、汇总、阈值判断
//! - `orchestrator/progress` - 进度上报
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 三个出题用例及其面向用户的结果
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::{App, Command};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Document, QuestionItem, QuizSet, StudyPlan, Subject, SyllabusCatalog};
pub use orchestrator::{
    BatchOrchestrator, BatchPlan, ProgressReporter, ProgressState, WatchReporter,
};
pub use services::{CompletionRequest, GenerationBackend, LlmService, StudyAssistant};
pub use workflow::{GenerationOutcome, StudyGenerator, UseCase, UseCaseRequest};
