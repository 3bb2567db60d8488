use crate::{orchestrator::Orchestrator, ConfigError, Drafter, GraphConfig, Workflow};
use draft_generator::TextGenerator;
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

/// Parameters required to create a new drafter.
/// # Default Values
/// - `workflow`: `Workflow::patent()`
/// - `dependency_overrides`: `None`
/// - `temperature`: `0.1`
/// - `top_p`: `0.1`
/// - `extra_params`: `{}`
pub struct DrafterParams {
    /// The collaborator every artifact is generated with.
    pub generator: Arc<dyn TextGenerator>,
    /// What each artifact depends on and how it is generated.
    pub workflow: Workflow,
    /// Replaces the dependency lists of the artifacts it names.
    pub dependency_overrides: Option<GraphConfig>,
    /// Amount of randomness injected into the response. Ranges from 0.0 to 1.0
    pub temperature: Option<f64>,
    /// An alternative to sampling with temperature, called nucleus sampling,
    /// where the model considers the results of the tokens with `top_p`
    /// probability mass. Ranges from 0.0 to 1.0
    pub top_p: Option<f64>,
    /// Provider specific parameters sent with every call.
    pub extra_params: BTreeMap<String, Value>,
}

impl DrafterParams {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            workflow: Workflow::patent(),
            dependency_overrides: None,
            temperature: Some(0.1),
            top_p: Some(0.1),
            extra_params: BTreeMap::new(),
        }
    }

    /// Set the workflow
    #[must_use]
    pub fn workflow(mut self, workflow: Workflow) -> Self {
        self.workflow = workflow;
        self
    }

    /// Override dependency lists of the workflow
    #[must_use]
    pub fn dependency_overrides(mut self, overrides: GraphConfig) -> Self {
        self.dependency_overrides = Some(overrides);
        self
    }

    /// Set the temperature for sampling
    /// Amount of randomness injected into the response. Ranges from 0.0 to 1.0
    #[must_use]
    pub fn temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the top-p for nucleus sampling
    #[must_use]
    pub fn top_p(mut self, top_p: Option<f64>) -> Self {
        self.top_p = top_p;
        self
    }

    /// Add a provider specific parameter
    #[must_use]
    pub fn add_extra_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra_params.insert(name.into(), value);
        self
    }

    /// Validate the configuration and create the drafter.
    pub fn build(self) -> Result<Drafter, ConfigError> {
        let mut graph = self.workflow.graph()?;
        if let Some(overrides) = &self.dependency_overrides {
            graph = graph.with_overrides(overrides)?;
        }
        self.workflow.validate(&graph)?;

        let orchestrator = Orchestrator::new(
            self.generator,
            Arc::new(self.workflow),
            Arc::new(graph),
            self.temperature,
            self.top_p,
            self.extra_params,
        );
        Ok(Drafter::new(orchestrator))
    }
}
