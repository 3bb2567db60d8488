use crate::{ArtifactId, Content, DraftError, DraftResult, TimestampLedger};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
struct VersionHistory {
    versions: Vec<Content>,
    active_index: usize,
}

/// Append-only version history for every artifact, with one active version
/// per artifact.
///
/// Versions are never edited in place. A commit always appends and activates
/// the new version, so going back to an earlier index is the only "undo".
#[derive(Debug, Default, Clone)]
pub struct ArtifactStore {
    histories: BTreeMap<ArtifactId, VersionHistory>,
}

impl ArtifactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The active version, or `None` when the artifact was never generated.
    #[must_use]
    pub fn get_active(&self, id: ArtifactId) -> Option<&Content> {
        let history = self.histories.get(&id)?;
        history.versions.get(history.active_index)
    }

    #[must_use]
    pub fn active_index(&self, id: ArtifactId) -> Option<usize> {
        self.histories
            .get(&id)
            .filter(|history| !history.versions.is_empty())
            .map(|history| history.active_index)
    }

    #[must_use]
    pub fn version_count(&self, id: ArtifactId) -> usize {
        self.histories
            .get(&id)
            .map_or(0, |history| history.versions.len())
    }

    #[must_use]
    pub fn versions(&self, id: ArtifactId) -> &[Content] {
        self.histories
            .get(&id)
            .map(|history| history.versions.as_slice())
            .unwrap_or_default()
    }

    /// Append `content` as the newest, active version of `id` and stamp `id`
    /// in the ledger. Returns the index of the new version.
    pub fn commit(
        &mut self,
        id: ArtifactId,
        content: Content,
        ledger: &mut TimestampLedger,
    ) -> DraftResult<usize> {
        let expected = id.shape();
        if content.shape() != expected {
            return Err(DraftError::ShapeMismatch {
                artifact: id,
                expected,
                found: content.shape(),
            });
        }

        let history = self.histories.entry(id).or_default();
        history.versions.push(content);
        history.active_index = history.versions.len() - 1;
        ledger.touch(id);

        tracing::debug!(
            artifact = id.as_str(),
            version = history.active_index,
            "committed artifact version"
        );
        Ok(history.active_index)
    }

    /// Make an existing version active. Does not append and does not touch
    /// the ledger.
    pub fn select_version(&mut self, id: ArtifactId, index: usize) -> DraftResult<()> {
        let count = self.version_count(id);
        match self.histories.get_mut(&id) {
            Some(history) if index < count => {
                history.active_index = index;
                Ok(())
            }
            _ => Err(DraftError::VersionOutOfRange {
                artifact: id,
                index,
                count,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContentShape, Drawing};

    fn text(s: &str) -> Content {
        Content::text(s)
    }

    #[test]
    fn empty_artifact_has_no_active_content() {
        let store = ArtifactStore::new();
        assert_eq!(store.get_active(ArtifactId::Title), None);
        assert_eq!(store.version_count(ArtifactId::Title), 0);
        assert_eq!(store.active_index(ArtifactId::Title), None);
    }

    #[test]
    fn commit_appends_activates_and_stamps() {
        let mut store = ArtifactStore::new();
        let mut ledger = TimestampLedger::new();

        store
            .commit(ArtifactId::Title, text("one"), &mut ledger)
            .expect("commit");
        let first = ledger.time_of(ArtifactId::Title).expect("stamped");

        let index = store
            .commit(ArtifactId::Title, text("two"), &mut ledger)
            .expect("commit");
        let second = ledger.time_of(ArtifactId::Title).expect("stamped");

        assert_eq!(index, 1);
        assert_eq!(store.version_count(ArtifactId::Title), 2);
        assert_eq!(store.get_active(ArtifactId::Title), Some(&text("two")));
        assert!(second > first);
    }

    #[test]
    fn select_version_moves_active_without_appending() {
        let mut store = ArtifactStore::new();
        let mut ledger = TimestampLedger::new();
        for s in ["a", "b", "c"] {
            store
                .commit(ArtifactId::Background, text(s), &mut ledger)
                .expect("commit");
        }
        let stamp = ledger.time_of(ArtifactId::Background);

        store
            .select_version(ArtifactId::Background, 0)
            .expect("in range");

        assert_eq!(store.get_active(ArtifactId::Background), Some(&text("a")));
        assert_eq!(store.version_count(ArtifactId::Background), 3);
        assert_eq!(ledger.time_of(ArtifactId::Background), stamp);

        let err = store
            .select_version(ArtifactId::Background, 3)
            .expect_err("out of range");
        assert!(matches!(
            err,
            DraftError::VersionOutOfRange { index: 3, count: 3, .. }
        ));
        assert_eq!(store.get_active(ArtifactId::Background), Some(&text("a")));
    }

    #[test]
    fn select_version_on_empty_artifact_fails() {
        let mut store = ArtifactStore::new();
        assert!(store.select_version(ArtifactId::Invention, 0).is_err());
    }

    #[test]
    fn commit_rejects_wrong_shape() {
        let mut store = ArtifactStore::new();
        let mut ledger = TimestampLedger::new();

        let err = store
            .commit(
                ArtifactId::Drawings,
                Content::text("not drawings"),
                &mut ledger,
            )
            .expect_err("shape mismatch");
        assert!(matches!(
            err,
            DraftError::ShapeMismatch {
                expected: ContentShape::DrawingList,
                found: ContentShape::Text,
                ..
            }
        ));
        assert_eq!(store.version_count(ArtifactId::Drawings), 0);
        assert_eq!(ledger.time_of(ArtifactId::Drawings), None);

        store
            .commit(
                ArtifactId::Drawings,
                Content::DrawingList(vec![Drawing::default()]),
                &mut ledger,
            )
            .expect("drawing list accepted");
    }
}
