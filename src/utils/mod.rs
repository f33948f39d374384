pub mod json_repair;
pub mod logging;

pub use json_repair::{parse_tolerant, repair};
pub use logging::truncate_text;
