use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Every artifact the drafter knows about. Sub-steps exist only to compose a
/// larger section but are versioned like any other artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ArtifactId {
    Title,
    TitleCandidates,
    Background,
    InventionPurpose,
    SolutionPoints,
    InventionSolutionDetail,
    InventionEffects,
    Invention,
    Drawings,
    Implementation,
}

impl ArtifactId {
    pub const ALL: [Self; 10] = [
        Self::Title,
        Self::TitleCandidates,
        Self::Background,
        Self::InventionPurpose,
        Self::SolutionPoints,
        Self::InventionSolutionDetail,
        Self::InventionEffects,
        Self::Invention,
        Self::Drawings,
        Self::Implementation,
    ];

    /// User-facing sections in document order.
    pub const SECTIONS: [Self; 5] = [
        Self::Title,
        Self::Background,
        Self::Invention,
        Self::Drawings,
        Self::Implementation,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::TitleCandidates => "title_candidates",
            Self::Background => "background",
            Self::InventionPurpose => "invention_purpose",
            Self::SolutionPoints => "solution_points",
            Self::InventionSolutionDetail => "invention_solution_detail",
            Self::InventionEffects => "invention_effects",
            Self::Invention => "invention",
            Self::Drawings => "drawings",
            Self::Implementation => "implementation",
        }
    }

    /// Heading used by the presentation layer.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "发明名称",
            Self::TitleCandidates => "备选发明名称",
            Self::Background => "背景技术",
            Self::InventionPurpose => "发明目的",
            Self::SolutionPoints => "技术要点",
            Self::InventionSolutionDetail => "技术解决方案",
            Self::InventionEffects => "技术效果",
            Self::Invention => "发明内容",
            Self::Drawings => "附图说明",
            Self::Implementation => "具体实施方式",
        }
    }

    #[must_use]
    pub fn is_sub_step(self) -> bool {
        !Self::SECTIONS.contains(&self)
    }

    #[must_use]
    pub fn shape(self) -> ContentShape {
        match self {
            Self::TitleCandidates | Self::SolutionPoints => ContentShape::TextList,
            Self::Drawings => ContentShape::DrawingList,
            _ => ContentShape::Text,
        }
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownArtifact(s.to_string()))
    }
}

/// A node of the dependency graph and a key of the timestamp ledger: either
/// the raw-input brief or a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Brief,
    Artifact(ArtifactId),
}

impl Key {
    pub const BRIEF_NAME: &'static str = "structured_brief";

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brief => Self::BRIEF_NAME,
            Self::Artifact(id) => id.as_str(),
        }
    }

    #[must_use]
    pub fn artifact(self) -> Option<ArtifactId> {
        match self {
            Self::Brief => None,
            Self::Artifact(id) => Some(id),
        }
    }
}

impl From<ArtifactId> for Key {
    fn from(id: ArtifactId) -> Self {
        Self::Artifact(id)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Key {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::BRIEF_NAME {
            return Ok(Self::Brief);
        }
        s.parse().map(Self::Artifact)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ContentShape {
    Text,
    TextList,
    DrawingList,
}

impl fmt::Display for ContentShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::TextList => "text list",
            Self::DrawingList => "drawing list",
        })
    }
}

/// One version of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Content {
    Text(String),
    TextList(Vec<String>),
    DrawingList(Vec<Drawing>),
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    #[must_use]
    pub fn shape(&self) -> ContentShape {
        match self {
            Self::Text(_) => ContentShape::Text,
            Self::TextList(_) => ContentShape::TextList,
            Self::DrawingList(_) => ContentShape::DrawingList,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            Self::TextList(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_drawings(&self) -> Option<&[Drawing]> {
        match self {
            Self::DrawingList(drawings) => Some(drawings),
            _ => None,
        }
    }

    /// The value substituted for this content inside a prompt.
    #[must_use]
    pub fn to_prompt_value(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::TextList(items) => items
                .iter()
                .map(|item| format!("- {item}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::DrawingList(drawings) => drawings
                .iter()
                .enumerate()
                .map(|(i, drawing)| format!("{}. {}: {}", i + 1, drawing.title, drawing.description))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Drawing {
    pub title: String,
    pub description: String,
    /// Mermaid source of the diagram.
    #[serde(default)]
    pub code: String,
}

/// Strip the optional ```` ```mermaid ```` fence around generated diagram code.
#[must_use]
pub fn clean_diagram_code(code: &str) -> String {
    let mut cleaned = code.trim();
    if let Some(rest) = cleaned.strip_prefix("```mermaid") {
        cleaned = rest.trim();
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest.trim();
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.trim();
    }
    cleaned.to_string()
}
