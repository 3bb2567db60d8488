use crate::ArtifactId;
use draft_generator::parse_structured;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const REFINED_DRAFT: &str = "refined_draft";

/// Sections that go through whole-draft refinement. Drawings are kept as
/// generated.
pub const REFINED_SECTIONS: [ArtifactId; 4] = [
    ArtifactId::Title,
    ArtifactId::Background,
    ArtifactId::Invention,
    ArtifactId::Implementation,
];

/// A polished rewrite of the whole draft. It lives next to the artifacts and
/// never becomes a version of any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct RefinedDraft {
    pub sections: BTreeMap<ArtifactId, String>,
}

impl RefinedDraft {
    #[must_use]
    pub fn section(&self, id: ArtifactId) -> Option<&str> {
        self.sections.get(&id).map(String::as_str)
    }

    /// Parse the editor's JSON answer. Sections it left out are simply
    /// missing from the result, but at least one must be present.
    pub(crate) fn parse(raw: &str) -> Result<Self, String> {
        let value: Value = parse_structured(raw).map_err(|err| err.to_string())?;
        let Value::Object(map) = value else {
            return Err("expected a JSON object".to_string());
        };

        let sections: BTreeMap<ArtifactId, String> = REFINED_SECTIONS
            .into_iter()
            .filter_map(|id| {
                let text = map.get(id.as_str())?.as_str()?.trim();
                (!text.is_empty()).then(|| (id, text.to_string()))
            })
            .collect();

        if sections.is_empty() {
            return Err("no refined section in the answer".to_string());
        }
        Ok(Self { sections })
    }
}
