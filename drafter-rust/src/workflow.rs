use crate::{
    prompts::{self, PromptRenderer},
    ArtifactId, BriefField, ConfigError, ContentShape, DependencyGraph, Key,
};
use draft_generator::ResponseFormat;
use std::collections::{BTreeMap, BTreeSet};

/// Placeholders the drawing render template receives for each idea.
pub const DRAWING_TITLE: &str = "drawing_title";
pub const DRAWING_DESCRIPTION: &str = "drawing_description";
/// Placeholder the analysis template receives.
pub const USER_INPUT: &str = "user_input";
/// Field of the drawing plan answer that holds the ideas.
pub const DRAWING_LIST_KEY: &str = "drawings";

/// How the final content of a composite artifact is put together from its
/// sub-steps. Pure formatting, no further generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly {
    /// Each listed sub-step under a `###` heading with its label.
    Sections(Vec<ArtifactId>),
    /// The first item of a list sub-step.
    FirstItem(ArtifactId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipe {
    /// A single call whose output is the artifact. `Json` output is parsed
    /// as a list of strings, `Text` output is used as-is. When the answer is
    /// an object, the list is read from `list_key`.
    Prompt {
        template: String,
        format: ResponseFormat,
        list_key: Option<String>,
    },
    /// Sub-steps generated in order within one call, each one seeing the
    /// outputs of the steps before it.
    Composite {
        steps: Vec<ArtifactId>,
        assembly: Assembly,
    },
    /// One call plans the drawings, then one call per idea renders it.
    Drawings { ideas: String, render: String },
}

impl Recipe {
    pub fn text(template: impl Into<String>) -> Self {
        Self::Prompt {
            template: template.into(),
            format: ResponseFormat::Text,
            list_key: None,
        }
    }

    /// A JSON list prompt whose answer carries the list under `key`.
    pub fn list(key: impl Into<String>, template: impl Into<String>) -> Self {
        Self::Prompt {
            template: template.into(),
            format: ResponseFormat::Json,
            list_key: Some(key.into()),
        }
    }

    /// Artifacts this recipe produces itself during one call, besides the
    /// target.
    #[must_use]
    pub fn produced_steps(&self) -> &[ArtifactId] {
        match self {
            Self::Composite { steps, .. } => steps,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub dependencies: Vec<Key>,
    pub recipe: Recipe,
}

/// The typed drafting configuration: what each artifact depends on and how
/// it is generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    specs: BTreeMap<ArtifactId, ArtifactSpec>,
    analysis_template: String,
    refine_template: String,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::patent()
    }
}

impl Workflow {
    /// The patent application workflow.
    #[must_use]
    pub fn patent() -> Self {
        use ArtifactId::{
            Background, Drawings, Implementation, Invention, InventionEffects,
            InventionPurpose, InventionSolutionDetail, SolutionPoints, Title, TitleCandidates,
        };
        let a = Key::Artifact;
        let brief = Key::Brief;

        let specs = [
            (
                TitleCandidates,
                vec![brief],
                Recipe::list("titles", prompts::TITLE_CANDIDATES),
            ),
            (
                Title,
                vec![brief, a(TitleCandidates)],
                Recipe::Composite {
                    steps: vec![TitleCandidates],
                    assembly: Assembly::FirstItem(TitleCandidates),
                },
            ),
            (
                Background,
                vec![a(Title), brief],
                Recipe::text(prompts::BACKGROUND),
            ),
            (
                InventionPurpose,
                vec![a(Title), a(Background), brief],
                Recipe::text(prompts::INVENTION_PURPOSE),
            ),
            (
                SolutionPoints,
                vec![brief],
                Recipe::list("points", prompts::SOLUTION_POINTS),
            ),
            (
                InventionSolutionDetail,
                vec![a(Title), a(SolutionPoints), brief],
                Recipe::text(prompts::INVENTION_SOLUTION_DETAIL),
            ),
            (
                InventionEffects,
                vec![a(InventionSolutionDetail), brief],
                Recipe::text(prompts::INVENTION_EFFECTS),
            ),
            (
                Invention,
                vec![
                    a(Title),
                    a(Background),
                    brief,
                    a(InventionPurpose),
                    a(SolutionPoints),
                    a(InventionSolutionDetail),
                    a(InventionEffects),
                ],
                Recipe::Composite {
                    steps: vec![
                        InventionPurpose,
                        SolutionPoints,
                        InventionSolutionDetail,
                        InventionEffects,
                    ],
                    assembly: Assembly::Sections(vec![
                        InventionPurpose,
                        InventionSolutionDetail,
                        InventionEffects,
                    ]),
                },
            ),
            (
                Drawings,
                vec![a(Invention), a(InventionSolutionDetail)],
                Recipe::Drawings {
                    ideas: prompts::DRAWING_IDEAS.to_string(),
                    render: prompts::DRAWING_CODE.to_string(),
                },
            ),
            (
                Implementation,
                vec![a(Title), a(Invention), brief],
                Recipe::text(prompts::IMPLEMENTATION),
            ),
        ];

        Self {
            specs: specs
                .into_iter()
                .map(|(id, dependencies, recipe)| {
                    (
                        id,
                        ArtifactSpec {
                            dependencies,
                            recipe,
                        },
                    )
                })
                .collect(),
            analysis_template: prompts::ANALYZE.to_string(),
            refine_template: prompts::REFINE.to_string(),
        }
    }

    /// Replace the spec of one artifact.
    #[must_use]
    pub fn with_spec(mut self, id: ArtifactId, spec: ArtifactSpec) -> Self {
        self.specs.insert(id, spec);
        self
    }

    #[must_use]
    pub fn with_analysis_template(mut self, template: impl Into<String>) -> Self {
        self.analysis_template = template.into();
        self
    }

    #[must_use]
    pub fn with_refine_template(mut self, template: impl Into<String>) -> Self {
        self.refine_template = template.into();
        self
    }

    #[must_use]
    pub fn spec(&self, id: ArtifactId) -> Option<&ArtifactSpec> {
        self.specs.get(&id)
    }

    pub(crate) fn recipe(&self, id: ArtifactId) -> Result<&Recipe, ConfigError> {
        self.specs
            .get(&id)
            .map(|spec| &spec.recipe)
            .ok_or(ConfigError::MissingRecipe(id))
    }

    #[must_use]
    pub fn analysis_template(&self) -> &str {
        &self.analysis_template
    }

    #[must_use]
    pub fn refine_template(&self) -> &str {
        &self.refine_template
    }

    /// The dependency graph declared by the specs.
    pub fn graph(&self) -> Result<DependencyGraph, ConfigError> {
        DependencyGraph::new(
            self.specs
                .iter()
                .map(|(id, spec)| (*id, spec.dependencies.iter().copied())),
        )
    }

    /// Check that every artifact can actually be generated against `graph`.
    pub fn validate(&self, graph: &DependencyGraph) -> Result<(), ConfigError> {
        let prompts = PromptRenderer::new();
        for id in ArtifactId::ALL {
            let recipe = self.recipe(id)?;
            match recipe {
                Recipe::Prompt {
                    template, format, ..
                } => {
                    let expected = match format {
                        ResponseFormat::Text => ContentShape::Text,
                        ResponseFormat::Json => ContentShape::TextList,
                    };
                    if id.shape() != expected {
                        return Err(ConfigError::InvalidStep {
                            artifact: id,
                            step: id,
                            reason: format!("{format:?} output cannot produce {} content", id.shape()),
                        });
                    }
                    check_placeholders(&prompts, id.as_str(), template, &available(graph, id))?;
                }
                Recipe::Composite { steps, assembly } => {
                    self.validate_composite(graph, id, steps, assembly)?;
                }
                Recipe::Drawings { ideas, render } => {
                    if id.shape() != ContentShape::DrawingList {
                        return Err(ConfigError::InvalidStep {
                            artifact: id,
                            step: id,
                            reason: "drawing recipes must produce drawing lists".to_string(),
                        });
                    }
                    let mut names = available(graph, id);
                    check_placeholders(&prompts, id.as_str(), ideas, &names)?;
                    names.insert(DRAWING_TITLE.to_string());
                    names.insert(DRAWING_DESCRIPTION.to_string());
                    check_placeholders(&prompts, id.as_str(), render, &names)?;
                }
            }
        }

        let analysis_names = BTreeSet::from([USER_INPUT.to_string()]);
        check_placeholders(&prompts, "analysis", &self.analysis_template, &analysis_names)?;

        let refine_names: BTreeSet<String> = ArtifactId::SECTIONS
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();
        check_placeholders(&prompts, "refine", &self.refine_template, &refine_names)
    }

    fn validate_composite(
        &self,
        graph: &DependencyGraph,
        id: ArtifactId,
        steps: &[ArtifactId],
        assembly: &Assembly,
    ) -> Result<(), ConfigError> {
        let invalid = |step: ArtifactId, reason: &str| ConfigError::InvalidStep {
            artifact: id,
            step,
            reason: reason.to_string(),
        };
        let parent_deps = graph.dependencies_of(id);
        let mut done: Vec<ArtifactId> = Vec::with_capacity(steps.len());

        for &step in steps {
            if !step.is_sub_step() {
                return Err(invalid(step, "only sub-steps can be composed"));
            }
            if !matches!(self.recipe(step)?, Recipe::Prompt { .. }) {
                return Err(invalid(step, "a composed step must be a single prompt"));
            }
            if !parent_deps.contains(&Key::Artifact(step)) {
                return Err(invalid(step, "the step must be listed as a dependency"));
            }
            for dep in graph.dependencies_of(step) {
                let satisfied = match dep.artifact() {
                    None => parent_deps.contains(dep),
                    Some(dep_id) if steps.contains(&dep_id) => done.contains(&dep_id),
                    Some(_) => parent_deps.contains(dep),
                };
                if !satisfied {
                    return Err(invalid(
                        step,
                        &format!("needs {dep}, which is not available at that point"),
                    ));
                }
            }
            done.push(step);
        }

        match assembly {
            Assembly::Sections(parts) => {
                if id.shape() != ContentShape::Text {
                    return Err(invalid(id, "sections assemble into text"));
                }
                if let Some(part) = parts.iter().find(|part| !steps.contains(part)) {
                    return Err(invalid(*part, "assembled part is not a step"));
                }
                if let Some(part) = parts.iter().find(|part| part.shape() != ContentShape::Text) {
                    return Err(invalid(*part, "assembled part must be text"));
                }
            }
            Assembly::FirstItem(source) => {
                if !steps.contains(source) || source.shape() != ContentShape::TextList {
                    return Err(invalid(*source, "first item must come from a list step"));
                }
                if id.shape() != ContentShape::Text {
                    return Err(invalid(id, "first item assembles into text"));
                }
            }
        }
        Ok(())
    }
}

/// Placeholder names a prompt of `id` can rely on: its dependencies, with the
/// brief expanded into its fields.
fn available(graph: &DependencyGraph, id: ArtifactId) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for dep in graph.dependencies_of(id) {
        match dep {
            Key::Brief => names.extend(BriefField::ALL.iter().map(|f| f.as_str().to_string())),
            Key::Artifact(dep_id) => {
                names.insert(dep_id.as_str().to_string());
            }
        }
    }
    names
}

fn check_placeholders(
    prompts: &PromptRenderer,
    template_name: &'static str,
    template: &str,
    names: &BTreeSet<String>,
) -> Result<(), ConfigError> {
    prompts
        .check(template, names.iter().map(String::as_str))
        .map_err(|err| err.for_template(template_name))
}
