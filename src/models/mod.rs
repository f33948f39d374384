pub mod document;
pub mod loaders;
pub mod question;
pub mod study_plan;
pub mod syllabus;

pub use document::Document;
pub use loaders::{builtin_syllabus, load_syllabus, load_syllabus_or_builtin};
pub use question::{Flashcard, Mistake, QuestionItem, QuizSet, OPTION_COUNT};
pub use study_plan::{DayStatus, StudyPlan, StudyPlanDay};
pub use syllabus::{Subject, SyllabusCatalog, Topic};
