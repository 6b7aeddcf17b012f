//! Undo/redo for a test's editable metadata.
//!
//! History entries are [`MetadataEdit`]s holding the before and after values
//! of title, start time and duration, not copies of the whole test. The
//! loaded state acts as the bottom entry: right after [`EditHistory::load`]
//! there is nothing to undo.
//!
//! Undo and redo only move the working copy. Writing it back into the
//! authoritative test list happens on an explicit [`EditHistory::save_into`].

use crate::error::{AssessmentError, EntityKind, Result};
use crate::model::{Test, TestMetadata};

/// One committed metadata change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEdit {
    pub before: TestMetadata,
    pub after: TestMetadata,
}

/// Linear undo/redo history over one test.
#[derive(Debug, Clone)]
pub struct EditHistory {
    working: Test,
    undo: Vec<MetadataEdit>,
    redo: Vec<MetadataEdit>,
}

impl EditHistory {
    /// Start editing a copy of `test` with empty stacks.
    pub fn load(test: &Test) -> Self {
        tracing::debug!("editing test '{}'", test.id());
        Self {
            working: test.clone(),
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Discard all history and start over from `test`.
    pub fn reload(&mut self, test: &Test) {
        *self = Self::load(test);
    }

    /// The working copy as of the latest commit, undo or redo.
    pub fn current(&self) -> &Test {
        &self.working
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Apply new metadata as the current state. Clears the redo stack.
    pub fn commit(
        &mut self,
        title: impl Into<String>,
        start_time: impl Into<String>,
        duration_minutes: i64,
    ) -> Result<&Test> {
        let after = TestMetadata::new(title, start_time, duration_minutes)?;
        let before = self.working.metadata();
        self.redo.clear();
        self.working.apply_metadata(&after);
        tracing::debug!(
            "committed edit to test '{}': '{}' -> '{}'",
            self.working.id(),
            before.title,
            after.title
        );
        self.undo.push(MetadataEdit { before, after });
        Ok(&self.working)
    }

    /// Step back one commit. `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<&Test> {
        let edit = self.undo.pop()?;
        self.working.apply_metadata(&edit.before);
        self.redo.push(edit);
        Some(&self.working)
    }

    /// Re-apply the last undone commit. `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<&Test> {
        let edit = self.redo.pop()?;
        self.working.apply_metadata(&edit.after);
        self.undo.push(edit);
        Some(&self.working)
    }

    /// Write the working metadata into the matching test of `tests`.
    pub fn save_into(&self, tests: &mut [Test]) -> Result<()> {
        let target = tests
            .iter_mut()
            .find(|t| t.id() == self.working.id())
            .ok_or_else(|| AssessmentError::not_found(EntityKind::Test, self.working.id()))?;
        target.apply_metadata(&self.working.metadata());
        Ok(())
    }
}
