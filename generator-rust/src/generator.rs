use crate::{GenerationRequest, GenerationResult};

/// A text-completion service. Implementations may dispatch to any backing
/// provider and shape the request however they like; callers only rely on
/// getting the literal completion back.
///
/// When [`GenerationRequest::structured_output_requested`] is true the
/// returned text is expected to contain a JSON document, but validating it is
/// the caller's job.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> &'static str;
    fn model_id(&self) -> String;
    async fn generate_text(&self, request: GenerationRequest) -> GenerationResult<String>;
}
