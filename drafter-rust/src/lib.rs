mod artifact;
mod brief;
mod drafter;
mod errors;
mod graph;
mod ledger;
pub mod opentelemetry;
mod orchestrator;
mod params;
pub mod prompts;
mod refined;
mod session;
mod staleness;
mod store;
mod workflow;

pub use artifact::{clean_diagram_code, ArtifactId, Content, ContentShape, Drawing, Key};
pub use brief::{Brief, BriefField};
pub use drafter::Drafter;
pub use errors::{ConfigError, DraftError, DraftResult};
pub use graph::{DependencyGraph, GraphConfig};
pub use ledger::{Timestamp, TimestampLedger};
pub use params::DrafterParams;
pub use refined::{RefinedDraft, REFINED_DRAFT, REFINED_SECTIONS};
pub use session::Session;
pub use staleness::{is_stale, ArtifactStatus};
pub use store::ArtifactStore;
pub use workflow::{
    ArtifactSpec, Assembly, Recipe, Workflow, DRAWING_DESCRIPTION, DRAWING_LIST_KEY, DRAWING_TITLE,
    USER_INPUT,
};
