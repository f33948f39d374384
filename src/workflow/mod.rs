pub mod generation_flow;
pub mod use_case;

pub use generation_flow::{GenerationOutcome, StudyGenerator, UseCaseRequest};
pub use use_case::UseCase;
