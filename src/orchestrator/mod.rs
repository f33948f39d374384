//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_generator` - 批量出题编排器
//! - 拆分批次、并发发起、按发起顺序汇总
//! - 完整度阈值判断（50%）与截断
//!
//! ### `progress` - 进度上报
//! - `(completed, total)` 快照与上报接口
//! - 闭包与 watch 通道两种接收方式
//!
//! ## 层次关系
//!
//! ```text
//! workflow::StudyGenerator (三种出题用例)
//!     ↓
//! batch_generator (处理 N 个批次)
//!     ↓
//! services::QuestionBatchService (处理单个批次，从不报错)
//!     ↓
//! services::GenerationBackend (外部模型)
//! ```

pub mod batch_generator;
pub mod progress;

pub use batch_generator::{BatchOrchestrator, BatchPlan, COMPLETENESS_THRESHOLD_PERCENT};
pub use progress::{ProgressReporter, ProgressState, WatchReporter};
