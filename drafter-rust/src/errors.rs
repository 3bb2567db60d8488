use crate::{ArtifactId, ContentShape};
use draft_generator::GenerationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DraftError {
    /// A required upstream artifact has no active content yet.
    #[error("{target} requires {dependency} to be generated first")]
    MissingDependency {
        target: &'static str,
        dependency: ArtifactId,
    },
    /// The collaborator call failed. `target` names what was being produced:
    /// an artifact, the brief or the refined draft.
    #[error("Generation of {target} failed: {source}")]
    GenerationFailed {
        target: &'static str,
        #[source]
        source: GenerationError,
    },
    /// Structured output was requested but the completion did not parse.
    /// The raw completion is kept for diagnostics.
    #[error("Malformed structured output for {target}: {reason}")]
    MalformedStructuredOutput {
        target: &'static str,
        reason: String,
        raw: String,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("The session is busy with another operation")]
    Busy,
    #[error("Version {index} of {artifact} does not exist ({count} versions)")]
    VersionOutOfRange {
        artifact: ArtifactId,
        index: usize,
        count: usize,
    },
    #[error("{artifact} holds {expected} content, got {found}")]
    ShapeMismatch {
        artifact: ArtifactId,
        expected: ContentShape,
        found: ContentShape,
    },
    #[error("Drawing {index} does not exist ({count} drawings)")]
    DrawingOutOfRange { index: usize, count: usize },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Problems with the workflow configuration. These are detected once when a
/// session is built and prevent the session from being created.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown artifact: {0}")]
    UnknownArtifact(String),
    #[error("{artifact} depends on unknown artifact or input {dependency}")]
    UnknownDependency {
        artifact: String,
        dependency: String,
    },
    #[error("Dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("No recipe is configured for {0}")]
    MissingRecipe(ArtifactId),
    #[error("Invalid step {step} in {artifact}: {reason}")]
    InvalidStep {
        artifact: ArtifactId,
        step: ArtifactId,
        reason: String,
    },
    #[error("Prompt template {template} uses placeholder {placeholder} but nothing supplies it")]
    UnboundPlaceholder {
        template: &'static str,
        placeholder: String,
    },
    #[error("Prompt template {template} does not parse: {reason}")]
    InvalidTemplate {
        template: &'static str,
        reason: String,
    },
}

pub type DraftResult<T> = Result<T, DraftError>;
