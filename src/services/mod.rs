pub mod backend;
pub mod llm_service;
pub mod question_batch;
pub mod study_tools;

pub use backend::{CompletionRequest, GenerationBackend};
pub use llm_service::LlmService;
pub use question_batch::{GenerationRequest, QuestionBatchService};
pub use study_tools::StudyAssistant;
