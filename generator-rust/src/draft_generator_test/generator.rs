use std::{collections::VecDeque, sync::Mutex};

use crate::{GenerationError, GenerationRequest, GenerationResult, TextGenerator};

/// Result for a mocked `generate_text` call.
/// It can either be a completion text or an error to return.
pub enum MockGenerateResult {
    Text(String),
    Error(GenerationError),
}

impl MockGenerateResult {
    /// Construct a result that yields the provided completion.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Construct a result that yields the provided error.
    pub fn error(error: GenerationError) -> Self {
        Self::Error(error)
    }
}

impl From<&str> for MockGenerateResult {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for MockGenerateResult {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<GenerationError> for MockGenerateResult {
    fn from(error: GenerationError) -> Self {
        Self::Error(error)
    }
}

impl From<GenerationResult<String>> for MockGenerateResult {
    fn from(result: GenerationResult<String>) -> Self {
        match result {
            Ok(text) => Self::Text(text),
            Err(error) => Self::Error(error),
        }
    }
}

#[derive(Default)]
struct MockTextGeneratorState {
    mocked_results: VecDeque<MockGenerateResult>,
    tracked_requests: Vec<GenerationRequest>,
}

/// A mock generator for testing that tracks requests and yields predefined
/// completions in FIFO order.
pub struct MockTextGenerator {
    provider: &'static str,
    model_id: String,
    state: Mutex<MockTextGeneratorState>,
}

impl Default for MockTextGenerator {
    fn default() -> Self {
        Self {
            provider: "mock",
            model_id: "mock-model".to_string(),
            state: Mutex::new(MockTextGeneratorState::default()),
        }
    }
}

impl MockTextGenerator {
    /// Construct a new mock generator instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the provider identifier returned by the mock.
    pub fn set_provider(&mut self, provider: &'static str) {
        self.provider = provider;
    }

    /// Override the model identifier returned by the mock.
    pub fn set_model_id<S: Into<String>>(&mut self, model_id: S) {
        self.model_id = model_id.into();
    }

    /// Enqueue one or more mocked results.
    pub fn enqueue_results<I>(&self, results: I) -> &Self
    where
        I: IntoIterator<Item = MockGenerateResult>,
    {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.mocked_results.extend(results);
        drop(state);
        self
    }

    /// Convenience to enqueue a single mocked result.
    pub fn enqueue<R>(&self, result: R) -> &Self
    where
        R: Into<MockGenerateResult>,
    {
        self.enqueue_results(std::iter::once(result.into()))
    }

    /// Number of enqueued results that have not been consumed yet.
    pub fn pending_results(&self) -> usize {
        let state = self.state.lock().expect("mock state poisoned");
        state.mocked_results.len()
    }

    /// Retrieve the tracked requests accumulated so far.
    pub fn tracked_requests(&self) -> Vec<GenerationRequest> {
        let state = self.state.lock().expect("mock state poisoned");
        state.tracked_requests.clone()
    }

    /// Reset tracked requests without touching enqueued results.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.tracked_requests.clear();
    }

    /// Clear both tracked requests and enqueued results.
    pub fn restore(&self) {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.mocked_results.clear();
        state.tracked_requests.clear();
    }
}

#[async_trait::async_trait]
impl TextGenerator for MockTextGenerator {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn generate_text(&self, request: GenerationRequest) -> GenerationResult<String> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.tracked_requests.push(request);

        let result = state.mocked_results.pop_front().ok_or_else(|| {
            GenerationError::Invariant(self.provider, "no mocked results available".into())
        })?;

        match result {
            MockGenerateResult::Text(text) => Ok(text),
            MockGenerateResult::Error(error) => Err(error),
        }
    }
}
