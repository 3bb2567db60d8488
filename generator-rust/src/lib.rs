mod errors;
mod fallback;
mod generator;
mod json;
pub mod opentelemetry;
mod types;

pub mod draft_generator_test;

pub use errors::*;
pub use fallback::ParameterFallback;
pub use generator::TextGenerator;
pub use json::{extract_json, parse_structured};
pub use types::*;
