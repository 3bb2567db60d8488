use crate::{GenerationError, GenerationRequest, GenerationResult, TextGenerator};

/// Retries a request once without its `extra_params` when the wrapped
/// generator rejects one of them.
///
/// Some OpenAI-compatible endpoints reject vendor specific flags (such as a
/// "thinking" toggle) depending on the model. The flag is an optimisation,
/// so the request is repeated plainly instead of failing.
pub struct ParameterFallback<G> {
    inner: G,
}

impl<G> ParameterFallback<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

#[async_trait::async_trait]
impl<G> TextGenerator for ParameterFallback<G>
where
    G: TextGenerator,
{
    fn provider(&self) -> &'static str {
        self.inner.provider()
    }

    fn model_id(&self) -> String {
        self.inner.model_id()
    }

    async fn generate_text(&self, request: GenerationRequest) -> GenerationResult<String> {
        if request.extra_params.is_empty() {
            return self.inner.generate_text(request).await;
        }

        let plain = GenerationRequest {
            extra_params: Default::default(),
            ..request.clone()
        };
        match self.inner.generate_text(request).await {
            Err(GenerationError::UnsupportedParameter(provider, param)) => {
                tracing::debug!(provider, param, "retrying without extra parameters");
                self.inner.generate_text(plain).await
            }
            other => other,
        }
    }
}
