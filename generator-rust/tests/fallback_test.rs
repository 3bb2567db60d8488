use draft_generator::{
    draft_generator_test::{MockGenerateResult, MockTextGenerator},
    GenerationError, GenerationRequest, ParameterFallback, TextGenerator,
};
use serde_json::json;
use std::collections::BTreeMap;

fn request_with_thinking_flag() -> GenerationRequest {
    let mut extra = BTreeMap::new();
    extra.insert("enable_thinking".to_string(), json!(false));
    GenerationRequest::text("Write a title").with_extra_params(extra)
}

#[tokio::test]
async fn retries_without_extra_params_when_parameter_is_rejected() {
    let mock = MockTextGenerator::new();
    mock.enqueue(MockGenerateResult::error(
        GenerationError::UnsupportedParameter("mock", "enable_thinking".to_string()),
    ))
    .enqueue("A title");

    let generator = ParameterFallback::new(mock);
    let text = generator
        .generate_text(request_with_thinking_flag())
        .await
        .expect("retry should succeed");
    assert_eq!(text, "A title");

    let mock = generator.into_inner();
    let tracked = mock.tracked_requests();
    assert_eq!(tracked.len(), 2);
    assert!(tracked[0].extra_params.contains_key("enable_thinking"));
    assert!(tracked[1].extra_params.is_empty());
    assert_eq!(tracked[0].prompt, tracked[1].prompt);
}

#[tokio::test]
async fn other_errors_are_not_retried() {
    let mock = MockTextGenerator::new();
    mock.enqueue(MockGenerateResult::error(GenerationError::Refusal(
        "no".to_string(),
    )))
    .enqueue("unused");

    let generator = ParameterFallback::new(mock);
    let err = generator
        .generate_text(request_with_thinking_flag())
        .await
        .expect_err("refusal should surface");
    assert!(matches!(err, GenerationError::Refusal(_)));

    let mock = generator.into_inner();
    assert_eq!(mock.tracked_requests().len(), 1);
    assert_eq!(mock.pending_results(), 1);
}

#[tokio::test]
async fn plain_requests_pass_through_once() {
    let mock = MockTextGenerator::new();
    mock.enqueue(MockGenerateResult::error(
        GenerationError::UnsupportedParameter("mock", "temperature".to_string()),
    ));

    let generator = ParameterFallback::new(mock);
    let err = generator
        .generate_text(GenerationRequest::text("x"))
        .await
        .expect_err("no extra params means no retry");
    assert!(matches!(err, GenerationError::UnsupportedParameter(..)));
    assert_eq!(generator.provider(), "mock");
}
