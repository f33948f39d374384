//! 出题用例
//!
//! 封装"这是哪一种生成"这一信息：批次规划、日志标识和面向用户的提示文案

use std::fmt::Display;

use crate::orchestrator::BatchPlan;

/// 三种出题用例
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseCase {
    /// 单个子主题小测
    TopicQuiz,
    /// 全考纲模拟考试
    FullSimulation,
    /// 基于上传文档的模拟考试
    DocumentSimulation,
}

impl UseCase {
    pub fn plan(&self) -> BatchPlan {
        match self {
            UseCase::TopicQuiz => BatchPlan::TOPIC_QUIZ,
            UseCase::FullSimulation => BatchPlan::FULL_SIMULATION,
            UseCase::DocumentSimulation => BatchPlan::DOCUMENT_SIMULATION,
        }
    }

    /// 题目数量不足时展示给用户的文案
    pub fn failure_message(&self) -> &'static str {
        match self {
            UseCase::TopicQuiz => "No se pudo generar el quiz. Intenta de nuevo.",
            UseCase::FullSimulation => {
                "No se pudo generar el examen de simulación. Intenta de nuevo."
            }
            UseCase::DocumentSimulation => {
                "No se pudo generar el simulacro desde el documento. Intenta de nuevo."
            }
        }
    }

    /// 其他意外错误时展示给用户的文案
    pub fn unexpected_message(&self) -> &'static str {
        match self {
            UseCase::TopicQuiz => "Ocurrió un error al generar el quiz.",
            UseCase::FullSimulation => "Ocurrió un error al generar el examen de simulación.",
            UseCase::DocumentSimulation => {
                "Ocurrió un error al generar el simulacro desde el documento."
            }
        }
    }
}

impl Display for UseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UseCase::TopicQuiz => "主题小测",
            UseCase::FullSimulation => "模拟考试",
            UseCase::DocumentSimulation => "文档模拟考试",
        };
        write!(f, "{}", label)
    }
}
