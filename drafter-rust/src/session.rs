use crate::{
    artifact::clean_diagram_code,
    opentelemetry::{record_committed, trace_operation, SessionOperation},
    orchestrator::Orchestrator,
    refined::{RefinedDraft, REFINED_DRAFT},
    staleness, ArtifactId, ArtifactStatus, ArtifactStore, Brief, BriefField, Content,
    DependencyGraph, DraftError, DraftResult, Key, Timestamp, TimestampLedger,
};
use futures::lock::Mutex;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Default)]
struct SessionState {
    store: ArtifactStore,
    ledger: TimestampLedger,
    brief: Brief,
    refined: Option<RefinedDraft>,
}

impl SessionState {
    /// Commit staged versions in order and return the index of the last one.
    fn commit_all(&mut self, staged: Vec<(ArtifactId, Content)>) -> DraftResult<usize> {
        let count = staged.len();
        let mut index = 0;
        for (id, content) in staged {
            index = self.store.commit(id, content, &mut self.ledger)?;
        }
        record_committed(count);
        Ok(index)
    }

    fn active_drawing(&self, index: usize) -> DraftResult<&[crate::Drawing]> {
        let drawings = self
            .store
            .get_active(ArtifactId::Drawings)
            .and_then(Content::as_drawings)
            .unwrap_or_default();
        if index >= drawings.len() {
            return Err(DraftError::DrawingOutOfRange {
                index,
                count: drawings.len(),
            });
        }
        Ok(drawings)
    }
}

/// Marks the session busy for as long as it is alive.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> DraftResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DraftError::Busy)?;
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One user's drafting session: the brief, every artifact's version history
/// and the timestamps staleness is judged by.
///
/// Reads are always allowed. Only one mutating operation runs at a time; a
/// second one started meanwhile fails with [`DraftError::Busy`]. Failed
/// operations leave the state as it was.
pub struct Session {
    orchestrator: Arc<Orchestrator>,
    state: Mutex<SessionState>,
    busy: AtomicBool,
}

impl Session {
    pub(crate) fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            state: Mutex::new(SessionState::default()),
            busy: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        self.orchestrator.graph()
    }

    /// Whether a mutating operation is in progress.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Artifacts that list `key` as a direct dependency.
    #[must_use]
    pub fn dependents_of(&self, key: impl Into<Key>) -> Vec<ArtifactId> {
        self.graph().dependents_of(key)
    }

    pub async fn get_active(&self, id: ArtifactId) -> Option<Content> {
        self.state.lock().await.store.get_active(id).cloned()
    }

    pub async fn version_count(&self, id: ArtifactId) -> usize {
        self.state.lock().await.store.version_count(id)
    }

    pub async fn active_index(&self, id: ArtifactId) -> Option<usize> {
        self.state.lock().await.store.active_index(id)
    }

    pub async fn versions(&self, id: ArtifactId) -> Vec<Content> {
        self.state.lock().await.store.versions(id).to_vec()
    }

    pub async fn time_of(&self, key: impl Into<Key>) -> Option<Timestamp> {
        let key = key.into();
        self.state.lock().await.ledger.time_of(key)
    }

    pub async fn is_stale(&self, id: ArtifactId) -> bool {
        let state = self.state.lock().await;
        staleness::is_stale(self.graph(), &state.ledger, id)
    }

    pub async fn status(&self, id: ArtifactId) -> ArtifactStatus {
        let state = self.state.lock().await;
        ArtifactStatus::of(self.graph(), &state.ledger, id)
    }

    pub async fn brief(&self) -> Brief {
        self.state.lock().await.brief.clone()
    }

    pub async fn refined_draft(&self) -> Option<RefinedDraft> {
        self.state.lock().await.refined.clone()
    }

    /// Make an earlier version active again. Timestamps are left alone.
    pub async fn select_version(&self, id: ArtifactId, index: usize) -> DraftResult<()> {
        trace_operation(SessionOperation::SelectVersion, id.as_str(), async {
            let _guard = BusyGuard::acquire(&self.busy)?;
            let mut state = self.state.lock().await;
            state.store.select_version(id, index)?;
            tracing::debug!(artifact = id.as_str(), version = index, "selected version");
            Ok(())
        })
        .await
    }

    /// Commit user-authored content as a new version. Counts as a write for
    /// staleness just like a generated version.
    pub async fn commit_user_edit(&self, id: ArtifactId, content: Content) -> DraftResult<usize> {
        trace_operation(SessionOperation::CommitUserEdit, id.as_str(), async {
            let _guard = BusyGuard::acquire(&self.busy)?;
            self.state.lock().await.commit_all(vec![(id, content)])
        })
        .await
    }

    /// Edit one brief field. The brief is stamped only if the value changed.
    pub async fn update_brief(&self, field: BriefField, value: &str) -> DraftResult<bool> {
        trace_operation(SessionOperation::UpdateBrief, Key::BRIEF_NAME, async {
            let _guard = BusyGuard::acquire(&self.busy)?;
            let mut state = self.state.lock().await;
            let changed = state.brief.set(field, value);
            if changed {
                state.ledger.touch(Key::Brief);
                tracing::debug!(field = field.as_str(), "brief updated");
            }
            Ok(changed)
        })
        .await
    }

    /// Replace the whole brief and stamp it.
    pub async fn replace_brief(&self, brief: Brief) -> DraftResult<()> {
        trace_operation(SessionOperation::ReplaceBrief, Key::BRIEF_NAME, async {
            let _guard = BusyGuard::acquire(&self.busy)?;
            let mut state = self.state.lock().await;
            state.brief = brief;
            state.ledger.touch(Key::Brief);
            Ok(())
        })
        .await
    }

    /// Extract the brief from a free-text description of the invention and
    /// replace the current one with it.
    pub async fn analyze(&self, user_input: &str) -> DraftResult<()> {
        trace_operation(SessionOperation::Analyze, Key::BRIEF_NAME, async {
            let _guard = BusyGuard::acquire(&self.busy)?;
            let brief = self.orchestrator.analyze(user_input).await?;

            let mut state = self.state.lock().await;
            state.brief = brief;
            state.ledger.touch(Key::Brief);
            Ok(())
        })
        .await
    }

    /// Generate a new version of `id` from the active versions of its
    /// dependencies. Sub-steps produced along the way are committed under
    /// their own ids before `id`. Returns the index of the new version.
    pub async fn generate(&self, id: ArtifactId) -> DraftResult<usize> {
        trace_operation(SessionOperation::Generate, id.as_str(), async {
            let _guard = BusyGuard::acquire(&self.busy)?;
            self.generate_unguarded(id).await
        })
        .await
    }

    /// Generate every section in dependency order, stopping at the first
    /// failure. Sections generated before the failure keep their new version.
    pub async fn generate_all(&self) -> DraftResult<Vec<ArtifactId>> {
        trace_operation(SessionOperation::GenerateAll, "sections", async {
            let _guard = BusyGuard::acquire(&self.busy)?;
            let order: Vec<ArtifactId> = self
                .graph()
                .topological_order()?
                .into_iter()
                .filter(|id| ArtifactId::SECTIONS.contains(id))
                .collect();

            let mut generated = Vec::with_capacity(order.len());
            for id in order {
                self.generate_unguarded(id).await?;
                generated.push(id);
            }
            Ok(generated)
        })
        .await
    }

    /// Render the code of drawing `index` again and commit the drawing list
    /// with that one drawing replaced.
    pub async fn regenerate_drawing(&self, index: usize) -> DraftResult<usize> {
        let target = ArtifactId::Drawings;
        trace_operation(SessionOperation::RegenerateDrawing, target.as_str(), async {
            let _guard = BusyGuard::acquire(&self.busy)?;
            let (idea, values) = {
                let state = self.state.lock().await;
                let idea = state.active_drawing(index)?[index].clone();
                let values = self.orchestrator.resolve(target, &state.store, &state.brief)?;
                (idea, values)
            };

            let code = self
                .orchestrator
                .render_drawing(target, &idea, &values)
                .await?;

            let mut state = self.state.lock().await;
            let mut drawings = state.active_drawing(index)?.to_vec();
            drawings[index].code = code;
            state.commit_all(vec![(target, Content::DrawingList(drawings))])
        })
        .await
    }

    /// Commit the drawing list with the code of drawing `index` replaced by
    /// user-authored code.
    pub async fn edit_drawing_code(&self, index: usize, code: &str) -> DraftResult<usize> {
        let target = ArtifactId::Drawings;
        trace_operation(SessionOperation::EditDrawingCode, target.as_str(), async {
            let _guard = BusyGuard::acquire(&self.busy)?;
            let mut state = self.state.lock().await;
            let mut drawings = state.active_drawing(index)?.to_vec();
            drawings[index].code = clean_diagram_code(code);
            state.commit_all(vec![(target, Content::DrawingList(drawings))])
        })
        .await
    }

    /// Commit title candidate `index` of the active candidate list as the
    /// new title.
    pub async fn choose_title_candidate(&self, index: usize) -> DraftResult<usize> {
        let target = ArtifactId::Title;
        trace_operation(SessionOperation::ChooseTitleCandidate, target.as_str(), async {
            let _guard = BusyGuard::acquire(&self.busy)?;
            let mut state = self.state.lock().await;
            let candidates = state
                .store
                .get_active(ArtifactId::TitleCandidates)
                .and_then(Content::as_text_list)
                .ok_or(DraftError::MissingDependency {
                    target: target.as_str(),
                    dependency: ArtifactId::TitleCandidates,
                })?;
            let title = candidates.get(index).cloned().ok_or_else(|| {
                DraftError::InvalidInput(format!(
                    "title candidate {index} does not exist ({} candidates)",
                    candidates.len()
                ))
            })?;
            state.commit_all(vec![(target, Content::Text(title))])
        })
        .await
    }

    /// Produce a polished rewrite of the whole draft. The result is kept
    /// beside the artifacts; no artifact version or timestamp changes.
    pub async fn refine_draft(&self) -> DraftResult<RefinedDraft> {
        trace_operation(SessionOperation::Refine, REFINED_DRAFT, async {
            let _guard = BusyGuard::acquire(&self.busy)?;
            let values = {
                let state = self.state.lock().await;
                self.orchestrator.resolve_refinement(&state.store)?
            };
            let refined = self.orchestrator.refine(&values).await?;
            self.state.lock().await.refined = Some(refined.clone());
            Ok(refined)
        })
        .await
    }

    async fn generate_unguarded(&self, id: ArtifactId) -> DraftResult<usize> {
        let values = {
            let state = self.state.lock().await;
            self.orchestrator.resolve(id, &state.store, &state.brief)?
        };
        let staged = self.orchestrator.generate(id, values).await?;

        let index = self.state.lock().await.commit_all(staged)?;
        tracing::info!(artifact = id.as_str(), version = index, "generated artifact");
        Ok(index)
    }
}
