//! 进度上报
//!
//! 编排器每解决一个批次上报一次 `(completed, total)`，UI 层据此渲染进度条。
//! `completed` 统计的是"已结束的批次 × 批次大小"，与批次是否真的产出题目无关，
//! 所有批次结束时一定到达 `total`。

use serde::Serialize;
use tokio::sync::watch;

/// 进度快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub completed: usize,
    pub total: usize,
}

impl ProgressState {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// 百分比，`total` 为 0 时返回 0
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}

/// 进度接收方
pub trait ProgressReporter {
    fn report(&mut self, state: ProgressState);
}

impl<F: FnMut(ProgressState)> ProgressReporter for F {
    fn report(&mut self, state: ProgressState) {
        self(state)
    }
}

/// 基于 `tokio::sync::watch` 的上报器，订阅方总能读到最新进度
pub struct WatchReporter {
    sender: watch::Sender<ProgressState>,
}

impl WatchReporter {
    pub fn channel() -> (Self, watch::Receiver<ProgressState>) {
        let (sender, receiver) = watch::channel(ProgressState::default());
        (Self { sender }, receiver)
    }
}

impl ProgressReporter for WatchReporter {
    fn report(&mut self, state: ProgressState) {
        // 没有订阅方时也要保存最新值
        self.sender.send_replace(state);
    }
}

/// 单次生成调用内的进度累加器，不跨调用共享
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    completed_batches: usize,
    batch_size: usize,
    total: usize,
}

impl ProgressTracker {
    pub(crate) fn new(total: usize, batch_size: usize) -> Self {
        Self {
            completed_batches: 0,
            batch_size,
            total,
        }
    }

    pub(crate) fn start(&self) -> ProgressState {
        ProgressState::new(0, self.total)
    }

    /// 记录一个批次结束（不论成败）
    pub(crate) fn batch_resolved(&mut self) -> ProgressState {
        self.completed_batches += 1;
        let completed = (self.completed_batches * self.batch_size).min(self.total);
        ProgressState::new(completed, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_caps_at_total() {
        let mut tracker = ProgressTracker::new(10, 5);
        assert_eq!(tracker.start(), ProgressState::new(0, 10));
        assert_eq!(tracker.batch_resolved(), ProgressState::new(5, 10));
        assert_eq!(tracker.batch_resolved(), ProgressState::new(10, 10));
        assert_eq!(tracker.batch_resolved(), ProgressState::new(10, 10));
    }

    #[test]
    fn test_percentage() {
        assert_eq!(ProgressState::new(0, 0).percentage(), 0.0);
        assert_eq!(ProgressState::new(20, 80).percentage(), 25.0);
        assert!(ProgressState::new(80, 80).is_complete());
        assert!(!ProgressState::new(0, 0).is_complete());
    }

    #[test]
    fn test_closure_reporter() {
        let mut seen = Vec::new();
        {
            let mut reporter = |state: ProgressState| seen.push(state.completed);
            reporter.report(ProgressState::new(0, 10));
            reporter.report(ProgressState::new(5, 10));
        }
        assert_eq!(seen, vec![0, 5]);
    }

    #[tokio::test]
    async fn test_watch_reporter_keeps_latest() {
        let (mut reporter, mut receiver) = WatchReporter::channel();

        reporter.report(ProgressState::new(10, 30));
        reporter.report(ProgressState::new(20, 30));

        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow_and_update(), ProgressState::new(20, 30));
    }
}
