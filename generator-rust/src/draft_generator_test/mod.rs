//! Test doubles for code that depends on a [`TextGenerator`](crate::TextGenerator).

mod generator;

pub use generator::{MockGenerateResult, MockTextGenerator};
