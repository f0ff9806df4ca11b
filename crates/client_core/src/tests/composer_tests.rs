use shared::domain::{ThreadStatus, UserId};
use shared::protocol::ParticipantSummary;
use uuid::Uuid;

use super::*;
use crate::attachments::StagedAttachment;

fn participant(name: &str, is_self: bool) -> ParticipantSummary {
    ParticipantSummary {
        id: UserId(Uuid::new_v4()),
        display_name: name.into(),
        role: "teacher".into(),
        is_self,
    }
}

#[test]
fn composer_disabled_for_resolved_and_closed_threads() {
    let composer = Composer::new(Vec::new(), ThreadStatus::Active);
    assert!(composer.is_enabled());

    let mut composer = Composer::new(Vec::new(), ThreadStatus::Resolved);
    assert!(!composer.is_enabled());
    composer.set_draft("hello");
    assert_eq!(
        composer.prepare_send(),
        Err(ComposerError::ThreadNotActive {
            status: ThreadStatus::Resolved
        })
    );

    composer.set_status(ThreadStatus::Closed);
    assert_eq!(
        composer.prepare_send(),
        Err(ComposerError::ThreadNotActive {
            status: ThreadStatus::Closed
        })
    );
}

#[test]
fn empty_draft_without_attachments_is_rejected() {
    let mut composer = Composer::new(Vec::new(), ThreadStatus::Active);
    composer.set_draft("   ");
    assert_eq!(composer.prepare_send(), Err(ComposerError::EmptyDraft));
}

#[test]
fn whitespace_draft_with_staged_attachment_still_sends() {
    let mut composer = Composer::new(Vec::new(), ThreadStatus::Active);
    composer.set_draft("  ");
    composer.stager.begin_pick();
    composer
        .stager
        .finish_pick(vec![StagedAttachment::file("notes.pdf", 1, vec![1, 2, 3])]);

    let outgoing = composer.prepare_send().expect("attachment-only send");
    assert_eq!(outgoing.content, "");
    assert_eq!(outgoing.attachments.len(), 1);
    assert_eq!(outgoing.attachments[0].name, "notes.pdf");
}

#[test]
fn prepare_send_trims_and_resolves_mentions() {
    let alice = participant("Alice Baker", false);
    let roster = vec![alice.clone(), participant("Bob Cole", false)];
    let mut composer = Composer::new(roster, ThreadStatus::Active);
    composer.set_draft("  ping @[Alice Baker] and @[Nobody]  ");

    let outgoing = composer.prepare_send().expect("send");
    assert_eq!(outgoing.content, "ping @[Alice Baker] and @[Nobody]");
    assert_eq!(outgoing.mention_ids, vec![alice.id]);
}

#[test]
fn prepare_send_does_not_mutate_state() {
    let mut composer = Composer::new(Vec::new(), ThreadStatus::Active);
    composer.set_draft("keep me");
    composer.stager.begin_pick();
    composer
        .stager
        .finish_pick(vec![StagedAttachment::file("a.txt", 1, vec![0])]);

    let _ = composer.prepare_send().expect("send");
    assert_eq!(composer.draft(), "keep me");
    assert_eq!(composer.stager.len(), 1);

    composer.clear_after_send();
    assert_eq!(composer.draft(), "");
    assert!(composer.stager.is_empty());
}

#[test]
fn mention_flow_from_query_to_resolved_send() {
    let alice = participant("Alice Baker", false);
    let roster = vec![alice.clone(), participant("Alan Me", true)];
    let mut composer = Composer::new(roster, ThreadStatus::Active);
    composer.set_draft("Hello @Ali");

    let suggestions = composer.mention_suggestions();
    let names: Vec<_> = suggestions.iter().map(|p| p.display_name.clone()).collect();
    assert_eq!(names, vec!["Alice Baker"]);

    let query = composer.mention_query().expect("live query");
    composer.apply_mention(&query, "Alice Baker");
    assert_eq!(composer.draft(), "Hello @[Alice Baker] ");

    let outgoing = composer.prepare_send().expect("send");
    assert_eq!(outgoing.mention_ids, vec![alice.id]);
}

#[test]
fn caret_snaps_to_char_boundaries() {
    let mut composer = Composer::new(Vec::new(), ThreadStatus::Active);
    composer.set_draft("café @A");
    composer.set_caret(4); // inside the two-byte 'é'
    assert!(composer.mention_query().is_none());

    composer.set_caret(usize::MAX);
    assert_eq!(composer.mention_query().expect("query").query, "A");
}

#[test]
fn bracketed_half_typed_token_still_suggests_and_completes() {
    let alice = participant("Alice Baker", false);
    let roster = vec![alice.clone(), participant("Bob Cole", false)];
    let mut composer = Composer::new(roster, ThreadStatus::Active);
    composer.set_draft("Hello @[Alice");

    let suggestions = composer.mention_suggestions();
    let names: Vec<_> = suggestions.iter().map(|p| p.display_name.clone()).collect();
    assert_eq!(names, vec!["Alice Baker"]);

    let query = composer.mention_query().expect("live query");
    composer.apply_mention(&query, "Alice Baker");
    assert_eq!(composer.draft(), "Hello @[Alice Baker] ");

    let outgoing = composer.prepare_send().expect("send");
    assert_eq!(outgoing.mention_ids, vec![alice.id]);
}

#[test]
fn no_suggestions_once_whitespace_breaks_the_query() {
    let roster = vec![participant("Alice Baker", false)];
    let mut composer = Composer::new(roster, ThreadStatus::Active);
    composer.set_draft("Hello @Alice Baker");
    assert!(composer.mention_query().is_none());
    assert!(composer.mention_suggestions().is_empty());
}
