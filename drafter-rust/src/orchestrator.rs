use crate::{
    artifact::clean_diagram_code,
    prompts::{PromptRenderer, PromptValues},
    refined::{RefinedDraft, REFINED_DRAFT, REFINED_SECTIONS},
    workflow::{
        Assembly, Recipe, DRAWING_DESCRIPTION, DRAWING_LIST_KEY, DRAWING_TITLE, USER_INPUT,
    },
    ArtifactId, ArtifactStore, Brief, BriefField, ConfigError, Content, DependencyGraph,
    DraftError, DraftResult, Drawing, Key, Workflow,
};
use draft_generator::{
    opentelemetry::trace_generate_text, parse_structured, GenerationError, GenerationRequest,
    ResponseFormat, TextGenerator,
};
use serde::Deserialize;
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

/// Versions produced by one generation call, in commit order. Sub-steps come
/// first and the requested artifact last.
pub type Staged = Vec<(ArtifactId, Content)>;

/// Drives the collaborator calls that produce an artifact.
///
/// The orchestrator never touches the store itself: dependencies are resolved
/// into [`PromptValues`] up front and the produced versions are handed back
/// for the caller to commit, so a failed call leaves nothing behind.
pub struct Orchestrator {
    generator: Arc<dyn TextGenerator>,
    workflow: Arc<Workflow>,
    graph: Arc<DependencyGraph>,
    prompts: PromptRenderer,
    temperature: Option<f64>,
    top_p: Option<f64>,
    extra_params: BTreeMap<String, Value>,
}

impl Orchestrator {
    pub(crate) fn new(
        generator: Arc<dyn TextGenerator>,
        workflow: Arc<Workflow>,
        graph: Arc<DependencyGraph>,
        temperature: Option<f64>,
        top_p: Option<f64>,
        extra_params: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            generator,
            workflow,
            graph,
            prompts: PromptRenderer::new(),
            temperature,
            top_p,
            extra_params,
        }
    }

    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Collect the active content of every dependency of `id`.
    ///
    /// The brief is always usable, even when empty. Sub-steps that `id`
    /// produces itself are skipped since they are generated in the same call.
    pub fn resolve(
        &self,
        id: ArtifactId,
        store: &ArtifactStore,
        brief: &Brief,
    ) -> DraftResult<PromptValues> {
        let produced = self.workflow.recipe(id)?.produced_steps();
        let mut values = PromptValues::new();
        for dep in self.graph.dependencies_of(id) {
            match *dep {
                Key::Brief => {
                    for field in BriefField::ALL {
                        values.insert(field.as_str().to_string(), brief.get(field));
                    }
                }
                Key::Artifact(dep_id) if produced.contains(&dep_id) => {}
                Key::Artifact(dep_id) => {
                    let content =
                        store
                            .get_active(dep_id)
                            .ok_or(DraftError::MissingDependency {
                                target: id.as_str(),
                                dependency: dep_id,
                            })?;
                    values.insert(dep_id.as_str().to_string(), content.to_prompt_value());
                }
            }
        }
        Ok(values)
    }

    /// Produce new content for `id` from resolved dependency values.
    pub async fn generate(&self, id: ArtifactId, mut values: PromptValues) -> DraftResult<Staged> {
        match self.workflow.recipe(id)? {
            Recipe::Prompt {
                template,
                format,
                list_key,
            } => {
                let content = self
                    .run_prompt(id, template, *format, list_key.as_deref(), &values)
                    .await?;
                Ok(vec![(id, content)])
            }
            Recipe::Composite { steps, assembly } => {
                let mut staged = Staged::with_capacity(steps.len() + 1);
                for &step in steps {
                    let Recipe::Prompt {
                        template,
                        format,
                        list_key,
                    } = self.workflow.recipe(step)?
                    else {
                        return Err(ConfigError::InvalidStep {
                            artifact: id,
                            step,
                            reason: "a composed step must be a single prompt".to_string(),
                        }
                        .into());
                    };
                    let content = self
                        .run_prompt(step, template, *format, list_key.as_deref(), &values)
                        .await?;
                    values.insert(step.as_str().to_string(), content.to_prompt_value());
                    staged.push((step, content));
                }
                let assembled = assemble(id, assembly, &staged)?;
                staged.push((id, assembled));
                Ok(staged)
            }
            Recipe::Drawings { ideas, render } => {
                let content = self.run_drawings(id, ideas, render, &values).await?;
                Ok(vec![(id, content)])
            }
        }
    }

    /// Render the diagram code for a single drawing idea of `id`.
    pub async fn render_drawing(
        &self,
        id: ArtifactId,
        idea: &Drawing,
        values: &PromptValues,
    ) -> DraftResult<String> {
        let Recipe::Drawings { render, .. } = self.workflow.recipe(id)? else {
            return Err(DraftError::InvalidInput(format!("{id} is not a drawing list")));
        };
        self.render_drawing_with(id, render, idea, values).await
    }

    /// Extract a brief from the user's free-text description.
    pub async fn analyze(&self, user_input: &str) -> DraftResult<Brief> {
        if user_input.trim().is_empty() {
            return Err(DraftError::InvalidInput(
                "the invention description is empty".to_string(),
            ));
        }

        let values = PromptValues::from([(USER_INPUT.to_string(), user_input.to_string())]);
        let prompt =
            self.render_template(Key::BRIEF_NAME, self.workflow.analysis_template(), &values)?;
        let raw = self
            .call(Key::BRIEF_NAME, prompt, ResponseFormat::Json)
            .await?;

        let parsed = parse_structured::<Value>(&raw)
            .map_err(|err| err.to_string())
            .and_then(|value| Brief::from_json(&value))
            .and_then(|brief| {
                if brief.is_empty() {
                    Err("the answer contains no brief field".to_string())
                } else {
                    Ok(brief)
                }
            });
        parsed.map_err(|reason| DraftError::MalformedStructuredOutput {
            target: Key::BRIEF_NAME,
            reason,
            raw,
        })
    }

    /// Resolve the sections that go through refinement.
    pub fn resolve_refinement(&self, store: &ArtifactStore) -> DraftResult<PromptValues> {
        let mut values = PromptValues::new();
        for id in ArtifactId::SECTIONS {
            let content = store.get_active(id);
            if content.is_none() && REFINED_SECTIONS.contains(&id) {
                return Err(DraftError::MissingDependency {
                    target: REFINED_DRAFT,
                    dependency: id,
                });
            }
            values.insert(
                id.as_str().to_string(),
                content.map(Content::to_prompt_value).unwrap_or_default(),
            );
        }
        Ok(values)
    }

    /// Ask for a polished rewrite of the whole draft.
    pub async fn refine(&self, values: &PromptValues) -> DraftResult<RefinedDraft> {
        let prompt = self.render_template(REFINED_DRAFT, self.workflow.refine_template(), values)?;
        let raw = self.call(REFINED_DRAFT, prompt, ResponseFormat::Json).await?;
        RefinedDraft::parse(&raw).map_err(|reason| DraftError::MalformedStructuredOutput {
            target: REFINED_DRAFT,
            reason,
            raw,
        })
    }

    async fn run_prompt(
        &self,
        id: ArtifactId,
        template: &str,
        format: ResponseFormat,
        list_key: Option<&str>,
        values: &PromptValues,
    ) -> DraftResult<Content> {
        let prompt = self.render_template(id.as_str(), template, values)?;
        let raw = self.call(id.as_str(), prompt, format).await?;
        match format {
            ResponseFormat::Text => Ok(Content::Text(raw.trim().to_string())),
            ResponseFormat::Json => parse_text_list(&raw, list_key).map(Content::TextList).map_err(
                |reason| DraftError::MalformedStructuredOutput {
                    target: id.as_str(),
                    reason,
                    raw,
                },
            ),
        }
    }

    /// Plan the drawings, then render each idea. Every idea must render before
    /// anything is returned.
    async fn run_drawings(
        &self,
        id: ArtifactId,
        ideas_template: &str,
        render_template_str: &str,
        values: &PromptValues,
    ) -> DraftResult<Content> {
        let prompt = self.render_template(id.as_str(), ideas_template, values)?;
        let raw = self.call(id.as_str(), prompt, ResponseFormat::Json).await?;
        let ideas = parse_drawing_ideas(&raw).map_err(|reason| {
            DraftError::MalformedStructuredOutput {
                target: id.as_str(),
                reason,
                raw,
            }
        })?;

        let mut drawings = Vec::with_capacity(ideas.len());
        for idea in ideas {
            let code = self
                .render_drawing_with(id, render_template_str, &idea, values)
                .await?;
            drawings.push(Drawing { code, ..idea });
        }
        Ok(Content::DrawingList(drawings))
    }

    async fn render_drawing_with(
        &self,
        id: ArtifactId,
        template: &str,
        idea: &Drawing,
        values: &PromptValues,
    ) -> DraftResult<String> {
        let mut values = values.clone();
        values.insert(DRAWING_TITLE.to_string(), idea.title.clone());
        values.insert(DRAWING_DESCRIPTION.to_string(), idea.description.clone());
        let prompt = self.render_template(id.as_str(), template, &values)?;
        let raw = self.call(id.as_str(), prompt, ResponseFormat::Text).await?;
        Ok(clean_diagram_code(&raw))
    }

    fn render_template(
        &self,
        template_name: &'static str,
        template: &str,
        values: &PromptValues,
    ) -> DraftResult<String> {
        self.prompts
            .render(template, values)
            .map_err(|err| err.for_template(template_name).into())
    }

    async fn call(
        &self,
        target: &'static str,
        prompt: String,
        response_format: ResponseFormat,
    ) -> DraftResult<String> {
        let request = match response_format {
            ResponseFormat::Text => GenerationRequest::text(prompt),
            ResponseFormat::Json => GenerationRequest::json(prompt),
        }
        .with_sampling(self.temperature, self.top_p)
        .with_extra_params(self.extra_params.clone());
        let generator = &self.generator;
        let provider = generator.provider();

        let result = trace_generate_text(provider, &generator.model_id(), request, |request| {
            generator.generate_text(request)
        })
        .await;

        match result {
            Ok(text) if text.trim().is_empty() => Err(DraftError::GenerationFailed {
                target,
                source: GenerationError::Invariant(provider, "empty completion".to_string()),
            }),
            Ok(text) => Ok(text),
            Err(source) => Err(DraftError::GenerationFailed { target, source }),
        }
    }
}

fn assemble(id: ArtifactId, assembly: &Assembly, staged: &Staged) -> DraftResult<Content> {
    let find = |part: ArtifactId| {
        staged
            .iter()
            .find(|(step, _)| *step == part)
            .map(|(_, content)| content)
            .ok_or_else(|| ConfigError::InvalidStep {
                artifact: id,
                step: part,
                reason: "assembled part was not generated".to_string(),
            })
    };

    match assembly {
        Assembly::Sections(parts) => {
            let mut sections = Vec::with_capacity(parts.len());
            for &part in parts {
                let text = find(part)?.to_prompt_value();
                sections.push(format!("### {}\n\n{}", part.label(), text));
            }
            Ok(Content::Text(sections.join("\n\n")))
        }
        Assembly::FirstItem(source) => {
            let first = find(*source)?
                .as_text_list()
                .and_then(|items| items.first())
                .cloned()
                .ok_or_else(|| ConfigError::InvalidStep {
                    artifact: id,
                    step: *source,
                    reason: "the list step produced no item".to_string(),
                })?;
            Ok(Content::Text(first))
        }
    }
}

/// A JSON list, either bare or inside an object (JSON modes usually insist
/// on an object at the top level). Inside an object the list is read from
/// `key`; without a key the object must hold exactly one list.
fn json_list(raw: &str, key: Option<&str>) -> Result<Vec<Value>, String> {
    match parse_structured::<Value>(raw).map_err(|err| err.to_string())? {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match key {
            Some(key) => match map.remove(key) {
                Some(Value::Array(items)) => Ok(items),
                Some(other) => Err(format!("expected `{key}` to be a JSON list, got {other}")),
                None => Err(format!("the answer has no `{key}` list")),
            },
            None => {
                let mut lists = map.into_iter().filter_map(|(_, value)| match value {
                    Value::Array(items) => Some(items),
                    _ => None,
                });
                match (lists.next(), lists.next()) {
                    (Some(items), None) => Ok(items),
                    (None, _) => Err("expected a JSON list".to_string()),
                    (Some(_), Some(_)) => Err("the answer holds more than one list".to_string()),
                }
            }
        },
        other => Err(format!("expected a JSON list, got {other}")),
    }
}

fn parse_text_list(raw: &str, key: Option<&str>) -> Result<Vec<String>, String> {
    let items: Vec<String> = json_list(raw, key)?
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() {
        return Err("the list is empty".to_string());
    }
    Ok(items)
}

#[derive(Deserialize)]
struct DrawingIdea {
    title: String,
    #[serde(default)]
    description: String,
}

fn parse_drawing_ideas(raw: &str) -> Result<Vec<Drawing>, String> {
    let ideas: Vec<DrawingIdea> =
        serde_json::from_value(Value::Array(json_list(raw, Some(DRAWING_LIST_KEY))?)).map_err(|err| err.to_string())?;
    if ideas.is_empty() {
        return Err("no drawing was proposed".to_string());
    }
    Ok(ideas
        .into_iter()
        .map(|idea| Drawing {
            title: idea.title.trim().to_string(),
            description: idea.description.trim().to_string(),
            code: String::new(),
        })
        .collect())
}
