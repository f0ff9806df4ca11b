//! Staged-attachment bookkeeping for the composer.
//!
//! The platform's file picker replaces rather than appends on repeated
//! invocations, and its selection state is not editable in place. The
//! stager therefore snapshots the staged set before each pick, merges the
//! snapshot with whatever the picker returns, and reinstalls the merged
//! set wholesale; removal and clearing go through the same reinstall path.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedKind {
    File,
    Voice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAttachment {
    pub name: String,
    pub byte_size: u64,
    /// Millisecond timestamp as reported by the platform file metadata.
    pub last_modified: i64,
    pub kind: StagedKind,
    pub data: Vec<u8>,
}

impl StagedAttachment {
    pub fn file(name: impl Into<String>, last_modified: i64, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            byte_size: data.len() as u64,
            last_modified,
            kind: StagedKind::File,
            data,
        }
    }

    /// Two staged attachments with equal keys are the same file.
    pub fn identity_key(&self) -> (&str, u64, i64) {
        (&self.name, self.byte_size, self.last_modified)
    }
}

#[derive(Debug, Default)]
pub struct AttachmentStager {
    staged: Vec<StagedAttachment>,
    picker_snapshot: Option<Vec<StagedAttachment>>,
}

impl AttachmentStager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the staged set right before opening the picker.
    pub fn begin_pick(&mut self) {
        self.picker_snapshot = Some(self.staged.clone());
    }

    /// Merge snapshot and fresh selection by identity key, first-seen order
    /// wins, and reinstall the result as the new staged set.
    pub fn finish_pick(&mut self, selected: Vec<StagedAttachment>) {
        let previous = self.picker_snapshot.take().unwrap_or_default();
        let mut merged: Vec<StagedAttachment> = Vec::with_capacity(previous.len() + selected.len());
        for candidate in previous.into_iter().chain(selected) {
            let duplicate = merged
                .iter()
                .any(|existing| existing.identity_key() == candidate.identity_key());
            if !duplicate {
                merged.push(candidate);
            }
        }
        self.reinstall(merged);
    }

    pub fn remove_at(&mut self, index: usize) {
        if index >= self.staged.len() {
            return;
        }
        let mut remaining = self.staged.clone();
        remaining.remove(index);
        self.reinstall(remaining);
    }

    pub fn clear_all(&mut self) {
        self.reinstall(Vec::new());
    }

    pub fn staged(&self) -> &[StagedAttachment] {
        &self.staged
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Hand the staged set to a send and leave the stager empty.
    pub fn take_all(&mut self) -> Vec<StagedAttachment> {
        self.picker_snapshot = None;
        std::mem::take(&mut self.staged)
    }

    fn reinstall(&mut self, staged: Vec<StagedAttachment>) {
        self.staged = staged;
    }
}
