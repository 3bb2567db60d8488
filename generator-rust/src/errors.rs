use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The provider could not be reached or answered with a failure.
    #[error("Provider error from {0}: {1}")]
    Provider(&'static str, String),
    /// The provider rejected one of the optional request parameters
    /// (the name of the parameter is carried in the second field).
    #[error("Unsupported parameter for {0}: {1}")]
    UnsupportedParameter(&'static str, String),
    /// The response from the provider was unexpected. (e.g. no completion
    /// text in an otherwise successful response)
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
    /// The model refused to process the prompt.
    #[error("Refusal: {0}")]
    Refusal(String),
}

pub type GenerationResult<T> = Result<T, GenerationError>;
