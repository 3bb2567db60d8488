use crate::{GenerationRequest, GenerationResult};
use opentelemetry::trace::Status;
use std::time::Instant;
use tracing::{info_span, Span};
use tracing_futures::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub struct GenerationSpan {
    span: Span,
    start_time: Instant,
    temperature: Option<f64>,
    top_p: Option<f64>,
    output_chars: Option<usize>,
}

impl GenerationSpan {
    pub fn new(provider: &str, model_id: &str, request: &GenerationRequest) -> Self {
        let span = info_span!("draft_generator.generate_text");
        span.set_attribute("gen_ai.operation.name", "generate_content");
        span.set_attribute("gen_ai.provider.name", provider.to_string());
        span.set_attribute("gen_ai.request.model", model_id.to_string());
        span.set_attribute(
            "draft_generator.structured_output",
            request.structured_output_requested(),
        );

        Self {
            span,
            start_time: Instant::now(),
            temperature: request.temperature,
            top_p: request.top_p,
            output_chars: None,
        }
    }

    fn span(&self) -> Span {
        self.span.clone()
    }

    pub fn on_response(&mut self, text: &str) {
        self.output_chars = Some(text.chars().count());
    }

    pub fn on_error(&mut self, error: &(dyn std::error::Error + 'static)) {
        self.span
            .set_attribute("exception.message", error.to_string());
        self.span.set_status(Status::error(error.to_string()));
    }

    pub fn on_end(&mut self) {
        if let Some(temperature) = self.temperature {
            self.span
                .set_attribute("gen_ai.request.temperature", temperature);
        }
        if let Some(top_p) = self.top_p {
            self.span.set_attribute("gen_ai.request.top_p", top_p);
        }
        if let Some(chars) = self.output_chars {
            self.span.set_attribute(
                "draft_generator.output_chars",
                i64::try_from(chars).unwrap_or(i64::MAX),
            );
        }
        self.span.set_attribute(
            "draft_generator.duration_seconds",
            self.start_time.elapsed().as_secs_f64(),
        );
    }
}

/// Run one collaborator call inside a [`GenerationSpan`].
pub async fn trace_generate_text<F, Fut>(
    provider: &str,
    model_id: &str,
    request: GenerationRequest,
    f: F,
) -> GenerationResult<String>
where
    F: FnOnce(GenerationRequest) -> Fut,
    Fut: std::future::Future<Output = GenerationResult<String>>,
{
    let mut span = GenerationSpan::new(provider, model_id, &request);
    let result = f(request).instrument(span.span()).await;

    match &result {
        Ok(text) => span.on_response(text),
        Err(error) => span.on_error(error),
    }

    span.on_end();
    result
}
