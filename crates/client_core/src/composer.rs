//! Message composer: draft text, staged attachments, mentions, and the
//! status gate. The composer validates and assembles outgoing sends; the
//! network round-trip and the single-flight guard live on `PortalClient`.

use shared::{
    domain::{ThreadStatus, UserId},
    protocol::ParticipantSummary,
};
use thiserror::Error;

use crate::{
    attachments::{AttachmentStager, StagedAttachment},
    mention::{self, MentionQuery},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposerError {
    #[error("thread is {status}; no further messages can be sent")]
    ThreadNotActive { status: ThreadStatus },
    #[error("nothing to send: type a message or attach a file")]
    EmptyDraft,
}

/// A validated send, ready for the multipart POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: String,
    pub mention_ids: Vec<UserId>,
    pub attachments: Vec<StagedAttachment>,
}

pub struct Composer {
    draft: String,
    caret: usize,
    roster: Vec<ParticipantSummary>,
    status: ThreadStatus,
    pub stager: AttachmentStager,
}

impl Composer {
    pub fn new(roster: Vec<ParticipantSummary>, status: ThreadStatus) -> Self {
        Self {
            draft: String::new(),
            caret: 0,
            roster,
            status,
            stager: AttachmentStager::new(),
        }
    }

    /// The status gate: input is accepted only while the thread is active.
    pub fn is_enabled(&self) -> bool {
        self.status.is_active()
    }

    pub fn set_status(&mut self, status: ThreadStatus) {
        self.status = status;
    }

    pub fn set_roster(&mut self, roster: Vec<ParticipantSummary>) {
        self.roster = roster;
    }

    pub fn roster(&self) -> &[ParticipantSummary] {
        &self.roster
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.caret = self.draft.len();
    }

    pub fn set_caret(&mut self, caret: usize) {
        let mut caret = caret.min(self.draft.len());
        // Offsets are bytes; snap back off the middle of a multi-byte char.
        while !self.draft.is_char_boundary(caret) {
            caret -= 1;
        }
        self.caret = caret;
    }

    /// The live mention query at the current caret, if any.
    pub fn mention_query(&self) -> Option<MentionQuery> {
        mention::active_mention_query(&self.draft, self.caret)
    }

    /// Roster completions for the live query. Empty means hide the popup.
    pub fn mention_suggestions(&self) -> Vec<&ParticipantSummary> {
        match self.mention_query() {
            Some(query) => mention::suggestions(&self.roster, &query.query),
            None => Vec::new(),
        }
    }

    /// Accept a suggestion, splicing the token at the query's `@` offset.
    pub fn apply_mention(&mut self, query: &MentionQuery, display_name: &str) {
        let (updated, caret) = mention::insert_mention(&self.draft, query, self.caret, display_name);
        self.draft = updated;
        self.caret = caret;
    }

    /// Validate the draft and assemble the outgoing payload. Does not
    /// mutate the composer: on a failed send the draft and staged
    /// attachments remain for retry; call `clear_after_send` only once the
    /// server has accepted.
    pub fn prepare_send(&self) -> Result<OutgoingMessage, ComposerError> {
        if !self.status.is_active() {
            return Err(ComposerError::ThreadNotActive {
                status: self.status,
            });
        }
        let content = self.draft.trim().to_string();
        if content.is_empty() && self.stager.is_empty() {
            return Err(ComposerError::EmptyDraft);
        }
        let mention_ids = mention::extract_mention_ids(&content, &self.roster);
        Ok(OutgoingMessage {
            content,
            mention_ids,
            attachments: self.stager.staged().to_vec(),
        })
    }

    pub fn clear_after_send(&mut self) {
        self.draft.clear();
        self.caret = 0;
        self.stager.clear_all();
    }
}

#[cfg(test)]
#[path = "tests/composer_tests.rs"]
mod tests;
