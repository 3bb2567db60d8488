use crate::ConfigError;
use handlebars::{no_escape, Handlebars, RenderError, RenderErrorReason};
use std::collections::BTreeMap;

/// Values substituted into `{{placeholder}}`s, keyed by placeholder name.
pub type PromptValues = BTreeMap<String, String>;

const ROLE: &str = "You are a senior patent attorney who drafts clear, rigorous Chinese \
patent applications. Answer in professional Chinese.";

pub const ANALYZE: &str = "{{role}}
Task: read the technical disclosure below and distill it into one JSON object. Reply with \
the JSON object only, starting with '{' and ending with '}'. Fields:
1. `background_technology`: the closest existing technology.
2. `problem_statement`: the concrete technical problem solved (1-2 sentences).
3. `core_inventive_concept`: the essential feature that differs from the prior art.
4. `technical_solution_summary`: an overview of the proposed solution.
5. `key_components_or_steps`: a list of the main components or process steps.
6. `achieved_effects`: concrete, preferably quantified benefits.

Technical disclosure:
{{user_input}}";

pub const TITLE_CANDIDATES: &str = "{{role}}
Task: propose 3 candidate invention titles of at most 25 Chinese characters that follow \
Chinese patent naming conventions. Reply with JSON only: {\"titles\": [\"...\", \"...\", \"...\"]}

Core inventive concept: {{core_inventive_concept}}
Technical solution summary: {{technical_solution_summary}}";

pub const BACKGROUND: &str = "{{role}}
Task: write the section \"Background art\" around the technical problem below. Describe \
the most relevant existing technology and objectively point out its shortcomings and their \
causes. Return Markdown.

Title: {{title}}
Known background: {{background_technology}}
Technical problem: {{problem_statement}}";

pub const INVENTION_PURPOSE: &str = "{{role}}
Task: write the \"Purpose of the invention\" paragraph. It must answer the problems raised \
in the background section. Return Markdown without a heading.

Title: {{title}}
Background section:
{{background}}
Technical problem: {{problem_statement}}";

pub const SOLUTION_POINTS: &str = "{{role}}
Task: list the key technical points of the solution, one concise sentence each, in the \
order they should be explained. Reply with JSON only: {\"points\": [\"...\"]}

Core inventive concept: {{core_inventive_concept}}
Technical solution summary: {{technical_solution_summary}}
Key components or steps:
{{key_components_or_steps}}";

pub const INVENTION_SOLUTION_DETAIL: &str = "{{role}}
Task: write the \"Technical solution\" part. Expand every key point below into a clear and \
complete description of the solution. Return Markdown without a heading.

Title: {{title}}
Key technical points:
{{solution_points}}
Technical solution summary: {{technical_solution_summary}}
Key components or steps:
{{key_components_or_steps}}";

pub const INVENTION_EFFECTS: &str = "{{role}}
Task: write the \"Technical effects\" part. Describe, factually and specifically, the \
effects achieved by the solution below compared with the prior art. Return Markdown \
without a heading.

Technical solution:
{{invention_solution_detail}}
Claimed effects: {{achieved_effects}}";

pub const DRAWING_IDEAS: &str = "{{role}}
Task: plan the drawings for this application. Each drawing must illustrate one aspect of \
the technical solution (system structure, method flow, data flow, ...). Reply with JSON \
only: {\"drawings\": [{\"title\": \"...\", \"description\": \"...\"}]}

Summary of the invention:
{{invention}}
Technical solution:
{{invention_solution_detail}}";

pub const DRAWING_CODE: &str = "{{role}}
Task: produce Mermaid code for the drawing below. Reply with the Mermaid code only.

Drawing title: {{drawing_title}}
What it should show: {{drawing_description}}
Technical solution for reference:
{{invention_solution_detail}}";

pub const IMPLEMENTATION: &str = "{{role}}
Task: write the section \"Detailed description of embodiments\". Make the solution \
concrete with at least one clear, workable embodiment, using the component list where \
helpful. Return Markdown.

Title: {{title}}
Summary of the invention (blueprint):
{{invention}}
Key components or steps:
{{key_components_or_steps}}";

pub const REFINE: &str = "{{role}}
Task: act as the chief editor. Restructure and polish the whole draft below so that the \
sections are consistent, deep and professional. Keep every technical fact. Reply with JSON \
only: {\"title\": \"...\", \"background\": \"...\", \"invention\": \"...\", \"implementation\": \"...\"}

# Title
{{title}}

# Background art
{{background}}

# Summary of the invention
{{invention}}

# Detailed description of embodiments
{{implementation}}";

/// Placeholder filled in for every template.
pub const ROLE_PLACEHOLDER: &str = "role";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// The template uses a placeholder that has no value.
    Unbound(String),
    /// The template does not parse.
    Invalid(String),
}

impl PromptError {
    pub(crate) fn for_template(self, template: &'static str) -> ConfigError {
        match self {
            Self::Unbound(placeholder) => ConfigError::UnboundPlaceholder {
                template,
                placeholder,
            },
            Self::Invalid(reason) => ConfigError::InvalidTemplate { template, reason },
        }
    }
}

impl From<RenderError> for PromptError {
    fn from(err: RenderError) -> Self {
        match err.reason() {
            RenderErrorReason::MissingVariable(Some(name)) => Self::Unbound(name.clone()),
            _ => Self::Invalid(err.to_string()),
        }
    }
}

/// Renders prompt templates with handlebars in strict mode, so a placeholder
/// without a value fails instead of rendering empty. Values are inserted
/// verbatim.
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    #[must_use]
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(no_escape);
        Self { handlebars }
    }

    /// `{{role}}` is always bound; everything else comes from `values`.
    pub fn render(&self, template: &str, values: &PromptValues) -> Result<String, PromptError> {
        let mut data = values.clone();
        data.entry(ROLE_PLACEHOLDER.to_string())
            .or_insert_with(|| ROLE.to_string());
        Ok(self.handlebars.render_template(template, &data)?)
    }

    /// Check that `template` parses and uses no placeholder outside `names`.
    pub fn check<'a>(
        &self,
        template: &str,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), PromptError> {
        let values: PromptValues = names
            .into_iter()
            .map(|name| (name.to_string(), String::new()))
            .collect();
        self.render(template, &values).map(drop)
    }
}
