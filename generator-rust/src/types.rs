use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The expected format of the completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free-form text (usually markdown).
    #[default]
    Text,
    /// A JSON document. Providers that support a JSON mode should enable it.
    Json,
}

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The full prompt, sent as one user turn.
    pub prompt: String,
    pub response_format: ResponseFormat,
    /// Amount of randomness injected into the response. Ranges from 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// An alternative to sampling with temperature, called nucleus sampling,
    /// where the model considers the results of the tokens with `top_p`
    /// probability mass. Ranges from 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Provider specific parameters that are forwarded as-is. A provider that
    /// does not understand one of them reports
    /// [`GenerationError::UnsupportedParameter`](crate::GenerationError::UnsupportedParameter).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_params: BTreeMap<String, Value>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_format: ResponseFormat::Json,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_sampling(mut self, temperature: Option<f64>, top_p: Option<f64>) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }

    #[must_use]
    pub fn with_extra_params(mut self, extra_params: BTreeMap<String, Value>) -> Self {
        self.extra_params = extra_params;
        self
    }

    #[must_use]
    pub fn structured_output_requested(&self) -> bool {
        self.response_format == ResponseFormat::Json
    }
}
