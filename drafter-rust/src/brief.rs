use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

/// Base facts about the invention, either typed in by the user or extracted
/// from their free-text description. The brief has no version history: edits
/// overwrite it and bump its timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct Brief {
    pub background_technology: String,
    pub problem_statement: String,
    pub core_inventive_concept: String,
    pub technical_solution_summary: String,
    pub key_components_or_steps: Vec<String>,
    pub achieved_effects: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum BriefField {
    BackgroundTechnology,
    ProblemStatement,
    CoreInventiveConcept,
    TechnicalSolutionSummary,
    KeyComponentsOrSteps,
    AchievedEffects,
}

impl BriefField {
    pub const ALL: [Self; 6] = [
        Self::BackgroundTechnology,
        Self::ProblemStatement,
        Self::CoreInventiveConcept,
        Self::TechnicalSolutionSummary,
        Self::KeyComponentsOrSteps,
        Self::AchievedEffects,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BackgroundTechnology => "background_technology",
            Self::ProblemStatement => "problem_statement",
            Self::CoreInventiveConcept => "core_inventive_concept",
            Self::TechnicalSolutionSummary => "technical_solution_summary",
            Self::KeyComponentsOrSteps => "key_components_or_steps",
            Self::AchievedEffects => "achieved_effects",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::BackgroundTechnology => "背景技术",
            Self::ProblemStatement => "待解决的技术问题",
            Self::CoreInventiveConcept => "核心创新点",
            Self::TechnicalSolutionSummary => "技术方案概述",
            Self::KeyComponentsOrSteps => "关键组件/步骤清单",
            Self::AchievedEffects => "有益效果",
        }
    }
}

impl fmt::Display for BriefField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BriefField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown brief field {s}"))
    }
}

impl Brief {
    /// Build a brief from the JSON object returned by the analysis call.
    ///
    /// Missing fields stay empty. Component lists may contain objects, in
    /// which case the first value of each object is used.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let Value::Object(map) = value else {
            return Err(format!("expected a JSON object, got {value}"));
        };

        let mut brief = Self::default();
        for field in BriefField::ALL {
            let Some(raw) = map.get(field.as_str()) else {
                continue;
            };
            match brief.text_field_mut(field) {
                Some(slot) => *slot = scalar_text(raw),
                None => brief.key_components_or_steps = list_items(raw),
            }
        }
        Ok(brief)
    }

    /// The field rendered as text. Component lists are one item per line.
    #[must_use]
    pub fn get(&self, field: BriefField) -> String {
        match field {
            BriefField::BackgroundTechnology => self.background_technology.clone(),
            BriefField::ProblemStatement => self.problem_statement.clone(),
            BriefField::CoreInventiveConcept => self.core_inventive_concept.clone(),
            BriefField::TechnicalSolutionSummary => self.technical_solution_summary.clone(),
            BriefField::KeyComponentsOrSteps => self.key_components_or_steps.join("\n"),
            BriefField::AchievedEffects => self.achieved_effects.clone(),
        }
    }

    /// Overwrite a field from its text form and report whether it changed.
    pub fn set(&mut self, field: BriefField, value: &str) -> bool {
        if field == BriefField::KeyComponentsOrSteps {
            let items: Vec<String> = value
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            if items == self.key_components_or_steps {
                return false;
            }
            self.key_components_or_steps = items;
            return true;
        }

        let Some(slot) = self.text_field_mut(field) else {
            return false;
        };
        if *slot == *value {
            return false;
        }
        value.clone_into(slot);
        true
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        BriefField::ALL
            .into_iter()
            .all(|field| self.get(field).trim().is_empty())
    }

    fn text_field_mut(&mut self, field: BriefField) -> Option<&mut String> {
        match field {
            BriefField::BackgroundTechnology => Some(&mut self.background_technology),
            BriefField::ProblemStatement => Some(&mut self.problem_statement),
            BriefField::CoreInventiveConcept => Some(&mut self.core_inventive_concept),
            BriefField::TechnicalSolutionSummary => Some(&mut self.technical_solution_summary),
            BriefField::KeyComponentsOrSteps => None,
            BriefField::AchievedEffects => Some(&mut self.achieved_effects),
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

fn list_items(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => map.values().next().map(scalar_text).unwrap_or_default(),
                other => scalar_text(other),
            })
            .collect(),
        Value::String(s) => s.lines().map(str::to_string).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    };
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
