use crate::{ArtifactId, DependencyGraph, TimestampLedger};
use serde::{Deserialize, Serialize};

/// Whether `id` was written before one of its direct dependencies.
///
/// Only direct dependencies are compared. An artifact two hops downstream of
/// a change only becomes stale once the artifact in between is regenerated,
/// which is what happens when sections are regenerated in dependency order.
/// An artifact that was never written is never stale.
#[must_use]
pub fn is_stale(graph: &DependencyGraph, ledger: &TimestampLedger, id: ArtifactId) -> bool {
    let Some(own) = ledger.time_of(id) else {
        return false;
    };
    graph
        .dependencies_of(id)
        .iter()
        .filter_map(|dep| ledger.time_of(*dep))
        .any(|dep_time| dep_time > own)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Ungenerated,
    Fresh,
    Stale,
}

impl ArtifactStatus {
    #[must_use]
    pub fn of(graph: &DependencyGraph, ledger: &TimestampLedger, id: ArtifactId) -> Self {
        if ledger.time_of(id).is_none() {
            Self::Ungenerated
        } else if is_stale(graph, ledger, id) {
            Self::Stale
        } else {
            Self::Fresh
        }
    }

    /// Marker appended to a section heading.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ungenerated => "(待生成)",
            Self::Fresh => "",
            Self::Stale => "⚠️ (依赖项已更新，建议重新生成)",
        }
    }
}
