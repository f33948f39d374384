pub mod toml_loader;

pub use toml_loader::{builtin_syllabus, load_syllabus, load_syllabus_or_builtin};
