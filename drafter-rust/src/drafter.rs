use crate::{orchestrator::Orchestrator, DependencyGraph, DrafterParams, Session, Workflow};
use draft_generator::TextGenerator;
use std::sync::Arc;

/// A validated drafting configuration bound to a generator.
///
/// The configuration is shared read-only between the sessions it creates;
/// every session owns its own artifacts, timestamps and brief.
#[derive(Clone)]
pub struct Drafter {
    orchestrator: Arc<Orchestrator>,
}

impl Drafter {
    pub(crate) fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn builder(generator: Arc<dyn TextGenerator>) -> DrafterParams {
        DrafterParams::new(generator)
    }

    /// Create an empty drafting session
    #[must_use]
    pub fn create_session(&self) -> Session {
        Session::new(self.orchestrator.clone())
    }

    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        self.orchestrator.graph()
    }

    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        self.orchestrator.workflow()
    }
}
