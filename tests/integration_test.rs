use async_trait::async_trait;
use prep_ai::error::{AppError, LlmError};
use prep_ai::models::load_syllabus_or_builtin;
use prep_ai::{
    App, AppResult, Command, CompletionRequest, Config, Document, GenerationBackend,
    GenerationOutcome, ProgressState, QuizSet, StudyGenerator, StudyPlan, UseCaseRequest,
    WatchReporter,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 按调用序号决定成败的假后端：`failing` 中的序号返回错误，其余返回 `per_batch` 道题
struct FakeBackend {
    per_batch: usize,
    failing: Vec<usize>,
    calls: AtomicUsize,
}

impl FakeBackend {
    fn new(per_batch: usize, failing: Vec<usize>) -> Arc<Self> {
        Arc::new(Self {
            per_batch,
            failing,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl GenerationBackend for FakeBackend {
    async fn complete(&self, request: &CompletionRequest) -> AppResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        // 错开完成顺序
        tokio::time::sleep(Duration::from_millis(((7 - call % 7) * 3) as u64)).await;

        if self.failing.contains(&call) {
            return Err(AppError::Llm(LlmError::EmptyContent {
                model: "fake".to_string(),
            }));
        }

        if request.response_schema.is_none() {
            return Ok("respuesta libre".to_string());
        }

        if request.user_message.contains("flashcards") {
            return Ok(json!({
                "flashcards": [
                    {"term": "Dominio", "definition": "Conjunto de entradas"},
                    {"term": "Rango", "definition": "Conjunto de salidas"}
                ]
            })
            .to_string());
        }

        if request.user_message.contains("plan de estudio") {
            return Ok(json!({
                "university": "USFQ",
                "weeks": 2,
                "hoursPerWeek": 10,
                "plan": [
                    {"day": 1, "week": 1, "subTopic": "Funciones", "topic": "Álgebra"},
                    {"day": 2, "week": 1, "subTopic": "Sinónimos", "topic": "Verbal"},
                    {"day": 1, "week": 2, "subTopic": "Fracciones", "topic": "Aritmética"}
                ]
            })
            .to_string());
        }

        let questions: Vec<_> = (0..self.per_batch)
            .map(|i| {
                json!({
                    "question": format!("llamada {} pregunta {}", call, i),
                    "options": ["A", "B", "C", "D"],
                    "correctAnswerIndex": 1,
                    "explanation": "B es correcta"
                })
            })
            .collect();
        Ok(format!("```json\n{}\n```", json!({ "questions": questions })))
    }
}

fn temp_output_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("prep_ai_test_{}_{}", name, std::process::id()))
}

async fn app_with(backend: Arc<FakeBackend>, name: &str) -> App {
    let config = Config {
        llm_api_key: "test-key".to_string(),
        output_dir: temp_output_dir(name).display().to_string(),
        ..Config::default()
    };
    App::with_backend(config, backend).await.unwrap()
}

#[test]
fn test_builtin_syllabus_loads() {
    let catalog = tokio_test::block_on(load_syllabus_or_builtin(None)).unwrap();
    assert_eq!(catalog.subjects.len(), 4);
    assert!(catalog.subject("senescyt").is_some());
}

#[tokio::test]
async fn test_topic_quiz_full_success() {
    let backend = FakeBackend::new(5, vec![]);
    let generator = StudyGenerator::new(backend.clone());

    let mut states = Vec::new();
    let quiz = generator
        .generate_topic_quiz("Funciones", &mut |s: ProgressState| states.push(s))
        .await
        .unwrap();

    assert_eq!(quiz.len(), 10);
    assert_eq!(
        states,
        vec![
            ProgressState::new(0, 10),
            ProgressState::new(5, 10),
            ProgressState::new(10, 10)
        ]
    );
}

#[tokio::test]
async fn test_simulation_partial_success_is_presented() {
    // 3 批中 1 批失败：20 道 ≥ 15，直接展示
    let backend = FakeBackend::new(10, vec![1]);
    let generator = StudyGenerator::new(backend.clone());
    let app_syllabus = load_syllabus_or_builtin(None).await.unwrap();
    let subject = app_syllabus.subject("USFQ").unwrap();

    let (mut reporter, receiver) = WatchReporter::channel();
    let outcome = generator
        .run(UseCaseRequest::FullSimulation { subject }, &mut reporter)
        .await;

    assert_eq!(outcome.quiz().map(QuizSet::len), Some(20));
    assert_eq!(*receiver.borrow(), ProgressState::new(30, 30));
}

#[tokio::test]
async fn test_document_simulation_below_threshold_fails() {
    // 8 批中 5 批失败：30 道 < 40
    let backend = FakeBackend::new(10, vec![0, 2, 3, 5, 7]);
    let generator = StudyGenerator::new(backend.clone());
    let document = Document::pdf(b"%PDF-1.4 contenido".to_vec());

    let outcome = generator
        .run(
            UseCaseRequest::DocumentSimulation {
                document: &document,
            },
            &mut |_: ProgressState| {},
        )
        .await;

    assert_eq!(
        outcome,
        GenerationOutcome::Failed {
            message: "No se pudo generar el simulacro desde el documento. Intenta de nuevo."
                .to_string()
        }
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_app_writes_quiz_json() {
    let backend = FakeBackend::new(5, vec![]);
    let app = app_with(backend, "quiz").await;

    let path = app
        .run(Command::Quiz {
            sub_topic: "Potenciación y radicación".to_string(),
        })
        .await
        .unwrap();

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    let quiz: QuizSet = serde_json::from_str(&content).unwrap();
    assert_eq!(quiz.len(), 10);
    assert!(content.contains("\"correctAnswerIndex\": 1"));

    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn test_app_reports_failure_message() {
    let backend = FakeBackend::new(10, vec![0, 1, 2]);
    let app = app_with(backend, "fail").await;

    let err = app
        .run(Command::Simulation { subject: None })
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "No se pudo generar el examen de simulación. Intenta de nuevo."
    );
}

#[tokio::test]
async fn test_app_unknown_subject() {
    let app = app_with(FakeBackend::new(10, vec![]), "unknown").await;

    let err = app
        .run(Command::Simulation {
            subject: Some("MIT".to_string()),
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("USFQ"));
}

#[tokio::test]
async fn test_app_flashcards_and_assistant() {
    let app = app_with(FakeBackend::new(5, vec![]), "cards").await;

    let path = app
        .run(Command::Flashcards {
            sub_topic: "Funciones".to_string(),
        })
        .await
        .unwrap();
    let content = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(content.contains("Dominio"));
    let _ = tokio::fs::remove_file(&path).await;

    let hint = app
        .assistant()
        .generate_hint("¿Cuánto es 2+2?", &["3".to_string(), "4".to_string()])
        .await;
    assert_eq!(hint, "respuesta libre");
}

#[tokio::test]
async fn test_app_writes_study_plan() {
    let backend = FakeBackend::new(5, vec![]);
    let app = app_with(backend.clone(), "plan").await;

    let path = app
        .run(Command::Plan {
            weeks: 2,
            hours_per_week: 10,
            subject: Some("USFQ".to_string()),
        })
        .await
        .unwrap();

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    let plan: StudyPlan = serde_json::from_str(&content).unwrap();
    assert_eq!(plan.plan.len(), 3);
    assert_eq!(plan.week(1).len(), 2);
    assert!(content.contains("\"status\": \"pending\""));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn test_app_rejects_plan_without_weeks() {
    let backend = FakeBackend::new(5, vec![]);
    let app = app_with(backend.clone(), "plan_zero").await;

    let result = app
        .run(Command::Plan {
            weeks: 0,
            hours_per_week: 10,
            subject: None,
        })
        .await;

    assert!(result.is_err());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_app_review_and_hint_from_saved_quiz() {
    let app = app_with(FakeBackend::new(5, vec![]), "review").await;

    let quiz_path = app
        .run(Command::Quiz {
            sub_topic: "Funciones".to_string(),
        })
        .await
        .unwrap();

    // 正确答案是 B（下标 1）：7 道答对，2 道答错，1 道未答
    let mut answers = vec![Some(1); 7];
    answers.extend([Some(0), Some(3), None]);
    let report_path = app
        .run(Command::Review {
            quiz: quiz_path.clone(),
            answers,
        })
        .await
        .unwrap();

    let report: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&report_path).await.unwrap()).unwrap();
    assert_eq!(report["score"], 7);
    assert_eq!(report["total"], 10);
    assert_eq!(report["mistakes"].as_array().map(Vec::len), Some(3));
    assert_eq!(report["mistakes"][2]["userAnswer"], "Sin responder");
    assert_eq!(report["analysis"], "respuesta libre");

    let hint_path = app
        .run(Command::Hint {
            quiz: quiz_path.clone(),
            number: 3,
        })
        .await
        .unwrap();
    assert_eq!(hint_path.extension().and_then(|e| e.to_str()), Some("md"));
    assert_eq!(
        tokio::fs::read_to_string(&hint_path).await.unwrap(),
        "respuesta libre"
    );

    let out_of_range = app
        .run(Command::Hint {
            quiz: quiz_path.clone(),
            number: 11,
        })
        .await;
    assert!(out_of_range.is_err());

    let wrong_count = app
        .run(Command::Review {
            quiz: quiz_path.clone(),
            answers: vec![Some(1)],
        })
        .await;
    assert!(wrong_count.is_err());

    for path in [quiz_path, report_path, hint_path] {
        let _ = tokio::fs::remove_file(&path).await;
    }
}

#[tokio::test]
async fn test_app_lesson_writes_markdown() {
    let app = app_with(FakeBackend::new(5, vec![]), "lesson").await;

    let path = app
        .run(Command::Lesson {
            sub_topic: "Funciones".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("md"));
    assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "respuesta libre");
    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn test_app_missing_pdf() {
    let app = app_with(FakeBackend::new(10, vec![]), "pdf").await;

    let result = app
        .run(Command::Pdf {
            path: PathBuf::from("/no/existe/guia.pdf"),
        })
        .await;

    assert!(result.is_err());
}

/// 真实接口测试
///
/// 运行方式：
/// ```bash
/// LLM_API_KEY=... cargo test test_live_topic_quiz -- --ignored --nocapture
/// ```
#[tokio::test]
#[ignore]
async fn test_live_topic_quiz() {
    prep_ai::utils::logging::init(true);

    let config = Config::from_env();
    let app = App::initialize(config).await.expect("初始化失败");

    let path = app
        .run(Command::Quiz {
            sub_topic: "Ecuaciones de primer grado".to_string(),
        })
        .await
        .expect("生成失败");

    println!("结果: {}", path.display());
}
