//! 出题流程 - 流程层
//!
//! 三个用例都是对编排器的直接调用，区别只在批次规划和提示词：
//!
//! | 用例 | 总题数 | 每批 | 批次 | 附件 |
//! |---|---|---|---|---|
//! | 主题小测 | 10 | 5 | 2 | 无 |
//! | 模拟考试 | 30 | 10 | 3 | 无 |
//! | 文档模拟考试 | 80 | 10 | 8 | 有 |

use std::sync::Arc;

use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::models::{Document, QuizSet, Subject};
use crate::orchestrator::{BatchOrchestrator, ProgressReporter};
use crate::services::{GenerationBackend, QuestionBatchService};
use crate::workflow::use_case::UseCase;

/// 用例的最终结果，直接交给展示层
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// 题目就绪（可能少于目标数量）
    Ready(QuizSet),
    /// 生成失败，不展示任何部分题目
    Failed { message: String },
}

impl GenerationOutcome {
    /// 把用例结果转换为用户可见的结果，任何错误都不会向上抛出
    pub fn from_result(use_case: UseCase, result: AppResult<QuizSet>) -> Self {
        match result {
            Ok(quiz) => GenerationOutcome::Ready(quiz),
            Err(e) if e.is_insufficient() => {
                error!("[{}] ❌ 生成失败: {}", use_case, e);
                GenerationOutcome::Failed {
                    message: use_case.failure_message().to_string(),
                }
            }
            Err(e) => {
                error!("[{}] ❌ 意外错误: {}", use_case, e);
                GenerationOutcome::Failed {
                    message: use_case.unexpected_message().to_string(),
                }
            }
        }
    }

    pub fn quiz(&self) -> Option<&QuizSet> {
        match self {
            GenerationOutcome::Ready(quiz) => Some(quiz),
            GenerationOutcome::Failed { .. } => None,
        }
    }
}

/// 出题流程
///
/// - 只负责构造提示词、选择批次规划
/// - 并发、汇总和阈值判断全部委托给编排器
pub struct StudyGenerator {
    orchestrator: BatchOrchestrator,
}

impl StudyGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            orchestrator: BatchOrchestrator::new(QuestionBatchService::new(backend)),
        }
    }

    /// 子主题小测
    pub async fn generate_topic_quiz<R>(
        &self,
        sub_topic: &str,
        reporter: &mut R,
    ) -> AppResult<QuizSet>
    where
        R: ProgressReporter + ?Sized,
    {
        let use_case = UseCase::TopicQuiz;
        let plan = use_case.plan();
        info!("[{}] 子主题: {}", use_case, sub_topic);

        self.orchestrator
            .generate(
                &use_case.to_string(),
                plan,
                |_| topic_quiz_prompt(sub_topic, plan.batch_size()),
                None,
                reporter,
            )
            .await
    }

    /// 覆盖整个考纲的模拟考试
    pub async fn generate_simulation_exam<R>(
        &self,
        subject: &Subject,
        reporter: &mut R,
    ) -> AppResult<QuizSet>
    where
        R: ProgressReporter + ?Sized,
    {
        let use_case = UseCase::FullSimulation;
        let plan = use_case.plan();
        info!(
            "[{}] 考试: {} ({} 个子主题)",
            use_case,
            subject.name,
            subject.sub_topic_count()
        );

        let outline = subject.outline();
        self.orchestrator
            .generate(
                &use_case.to_string(),
                plan,
                |_| simulation_prompt(&subject.name, &outline, plan.batch_size()),
                None,
                reporter,
            )
            .await
    }

    /// 基于上传文档的模拟考试，每批提示覆盖文档的不同部分
    pub async fn generate_document_simulation<R>(
        &self,
        document: &Document,
        reporter: &mut R,
    ) -> AppResult<QuizSet>
    where
        R: ProgressReporter + ?Sized,
    {
        let use_case = UseCase::DocumentSimulation;
        let plan = use_case.plan();

        if document.is_empty() {
            return Err(AppError::Other("文档内容为空".to_string()));
        }
        info!(
            "[{}] 附件: {} ({} 字节)",
            use_case,
            document.mime_type,
            document.len()
        );

        self.orchestrator
            .generate(
                &use_case.to_string(),
                plan,
                |index| document_prompt(index, plan.num_batches(), plan.batch_size()),
                Some(document),
                reporter,
            )
            .await
    }

    /// 执行用例并转换为用户可见结果
    pub async fn run<R>(&self, request: UseCaseRequest<'_>, reporter: &mut R) -> GenerationOutcome
    where
        R: ProgressReporter + ?Sized,
    {
        let use_case = request.use_case();
        let result = match request {
            UseCaseRequest::TopicQuiz { sub_topic } => {
                self.generate_topic_quiz(sub_topic, reporter).await
            }
            UseCaseRequest::FullSimulation { subject } => {
                self.generate_simulation_exam(subject, reporter).await
            }
            UseCaseRequest::DocumentSimulation { document } => {
                self.generate_document_simulation(document, reporter).await
            }
        };
        GenerationOutcome::from_result(use_case, result)
    }
}

/// 用例输入
#[derive(Debug, Clone, Copy)]
pub enum UseCaseRequest<'a> {
    TopicQuiz { sub_topic: &'a str },
    FullSimulation { subject: &'a Subject },
    DocumentSimulation { document: &'a Document },
}

impl UseCaseRequest<'_> {
    pub fn use_case(&self) -> UseCase {
        match self {
            UseCaseRequest::TopicQuiz { .. } => UseCase::TopicQuiz,
            UseCaseRequest::FullSimulation { .. } => UseCase::FullSimulation,
            UseCaseRequest::DocumentSimulation { .. } => UseCase::DocumentSimulation,
        }
    }
}

// ========== 提示词 ==========

fn topic_quiz_prompt(sub_topic: &str, batch_size: usize) -> String {
    format!(
        r#"Actúa como un examinador experto. Genera un lote de {} preguntas de opción múltiple, únicas y de dificultad variada sobre el subtema: "{}".
Cada pregunta debe tener 4 opciones (una correcta), y una explicación detallada.
Responde únicamente con el formato JSON especificado en el schema."#,
        batch_size, sub_topic
    )
}

fn simulation_prompt(subject_name: &str, outline: &str, batch_size: usize) -> String {
    format!(
        r#"Actúa como un comité de examinadores de élite. Genera un lote de {} preguntas de opción múltiple únicas y de dificultad variada para el examen de admisión "{}".
Las preguntas deben cubrir de manera equilibrada el programa de estudios general:
```
{}
```
Asegúrate de que este lote contribuya a la diversidad general del examen.
Cada pregunta debe tener 4 opciones (una correcta), y una explicación detallada.
Responde únicamente con el formato JSON especificado en el schema."#,
        batch_size, subject_name, outline
    )
}

fn document_prompt(batch_index: usize, num_batches: usize, batch_size: usize) -> String {
    format!(
        r#"Actúa como un examinador experto riguroso. Tienes acceso a un documento adjunto.

TU TAREA: Genera un lote de {} preguntas de opción múltiple de dificultad ALTA basadas EXCLUSIVAMENTE en el contenido de este documento.

Lote número: {} de {}.
Asegúrate de cubrir diferentes secciones del documento en cada lote si es posible, o enfócate en detalles profundos.

Cada pregunta debe tener 4 opciones (una correcta), y una explicación detallada que haga referencia al contenido del documento.
Responde únicamente con el formato JSON especificado en el schema."#,
        batch_size,
        batch_index + 1,
        num_batches
    )
}
