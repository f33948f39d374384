//! 批量出题编排器 - 编排层
//!
//! ## 职责
//!
//! 把"生成 N 道题"拆成若干批次，全部同时发出，汇总结果并判断是否达到完整度阈值。
//!
//! ## 核心流程
//!
//! 1. **拆分批次**：`num_batches = total_target / batch_size`，立即上报 `(0, total)`
//! 2. **并发发起**：所有批次同时在途，不限流，每批提示词由 `prompt_builder(batch_index)` 独立构造
//! 3. **逐批上报**：任一批次结束（无论先后、无论成败）上报一次进度
//! 4. **全部等待**：某批失败不会取消其他批次
//! 5. **按发起顺序拼接**：与完成顺序无关
//! 6. **阈值判断**：汇总数量低于目标的 50% 视为整体失败；否则截断到 `total_target`
//!
//! ## 设计特点
//!
//! - 所有批次在同一个任务内并发轮询（`FuturesUnordered`），不额外 spawn
//! - 进度计数器属于单次 `generate` 调用，多个生成同时进行互不干扰
//! - 不取消、不超时、不重试；超时由底层 HTTP 客户端处理并视为空批次

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{error, info, warn};

use crate::error::{AppResult, GenerationError};
use crate::models::{Document, QuestionItem, QuizSet};
use crate::orchestrator::progress::{ProgressReporter, ProgressTracker};
use crate::services::{GenerationRequest, QuestionBatchService};

/// 完整度阈值（百分比）
pub const COMPLETENESS_THRESHOLD_PERCENT: usize = 50;

/// 批次规划：总题数与每批题数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total_target: usize,
    batch_size: usize,
}

impl BatchPlan {
    /// 主题小测：10 题，2 批
    pub const TOPIC_QUIZ: BatchPlan = BatchPlan {
        total_target: 10,
        batch_size: 5,
    };
    /// 全考纲模拟考试：30 题，3 批
    pub const FULL_SIMULATION: BatchPlan = BatchPlan {
        total_target: 30,
        batch_size: 10,
    };
    /// 文档模拟考试：80 题，8 批
    pub const DOCUMENT_SIMULATION: BatchPlan = BatchPlan {
        total_target: 80,
        batch_size: 10,
    };

    /// 创建批次规划，总数必须是批次大小的正整数倍
    pub fn new(total_target: usize, batch_size: usize) -> AppResult<Self> {
        let plan = Self {
            total_target,
            batch_size,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn total_target(&self) -> usize {
        self.total_target
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_batches(&self) -> usize {
        self.total_target / self.batch_size
    }

    /// 判定成功所需的最少题目数（`total_target * 50%` 向上取整）
    pub fn min_required(&self) -> usize {
        (self.total_target * COMPLETENESS_THRESHOLD_PERCENT).div_ceil(100)
    }

    fn validate(&self) -> Result<(), GenerationError> {
        if self.total_target == 0
            || self.batch_size == 0
            || self.total_target % self.batch_size != 0
        {
            return Err(GenerationError::InvalidPlan {
                total_target: self.total_target,
                batch_size: self.batch_size,
            });
        }
        Ok(())
    }
}

/// 批量出题编排器
///
/// 持有出题批次服务，只做调度和汇总，不关心提示词内容。
pub struct BatchOrchestrator {
    batches: QuestionBatchService,
}

impl BatchOrchestrator {
    pub fn new(batches: QuestionBatchService) -> Self {
        Self { batches }
    }

    /// 按规划生成一套题目
    ///
    /// # 参数
    /// - `label`: 日志标识
    /// - `plan`: 批次规划
    /// - `prompt_builder`: 按批次下标（从 0 开始）构造提示词
    /// - `document`: 可选附件，每个批次都会带上
    /// - `reporter`: 进度接收方
    ///
    /// # 返回
    /// 达到阈值时返回题目集合（可能少于目标数量），否则返回 `InsufficientItems`
    pub async fn generate<P, R>(
        &self,
        label: &str,
        plan: BatchPlan,
        prompt_builder: P,
        document: Option<&Document>,
        reporter: &mut R,
    ) -> AppResult<QuizSet>
    where
        P: Fn(usize) -> String,
        R: ProgressReporter + ?Sized,
    {
        plan.validate()?;

        let num_batches = plan.num_batches();
        let mut tracker = ProgressTracker::new(plan.total_target(), plan.batch_size());
        reporter.report(tracker.start());

        log_generation_start(label, &plan);

        let requests: Vec<GenerationRequest> = (0..num_batches)
            .map(|index| {
                GenerationRequest::new(prompt_builder(index), plan.batch_size(), document.cloned())
            })
            .collect();

        let mut pending: FuturesUnordered<_> = requests
            .iter()
            .enumerate()
            .map(|(index, request)| async move {
                let batch_label = format!("{} 批次 {}/{}", label, index + 1, num_batches);
                let items = self.batches.request_batch(request, &batch_label).await;
                (index, items)
            })
            .collect();

        // 按发起顺序存放，完成顺序不影响最终拼接
        let mut batches: Vec<Vec<QuestionItem>> = vec![Vec::new(); num_batches];

        while let Some((index, items)) = pending.next().await {
            let state = tracker.batch_resolved();

            if items.is_empty() {
                warn!(
                    "[{}] ⚠️ 批次 {}/{} 返回 0 道题目",
                    label,
                    index + 1,
                    num_batches
                );
            } else {
                info!(
                    "[{}] ✓ 批次 {}/{} 完成: {} 道题目 (进度 {}/{})",
                    label,
                    index + 1,
                    num_batches,
                    items.len(),
                    state.completed,
                    state.total
                );
            }

            batches[index] = items;
            reporter.report(state);
        }

        let mut questions: Vec<QuestionItem> = batches.into_iter().flatten().collect();
        let obtained = questions.len();

        if obtained < plan.min_required() {
            error!(
                "[{}] ❌ 题目不足: 获得 {} 道, 至少需要 {} 道",
                label,
                obtained,
                plan.min_required()
            );
            return Err(GenerationError::InsufficientItems {
                obtained,
                required: plan.min_required(),
                total_target: plan.total_target(),
            }
            .into());
        }

        questions.truncate(plan.total_target());
        log_generation_complete(label, questions.len(), plan.total_target());

        Ok(QuizSet::new(questions))
    }
}

// ========== 日志辅助函数 ==========

fn log_generation_start(label: &str, plan: &BatchPlan) {
    info!("{}", "─".repeat(60));
    info!(
        "📦 [{}] 开始生成: 共 {} 道题目, {} 批 × {} 道",
        label,
        plan.total_target(),
        plan.num_batches(),
        plan.batch_size()
    );
}

fn log_generation_complete(label: &str, obtained: usize, total: usize) {
    if obtained < total {
        info!(
            "✓ [{}] 生成完成: {}/{} 道题目 (部分批次失败)",
            label, obtained, total
        );
    } else {
        info!("✓ [{}] 生成完成: {}/{} 道题目", label, obtained, total);
    }
    info!("{}", "─".repeat(60));
}
