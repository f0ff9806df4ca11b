//! @-mention parsing against the open thread's participant roster.
//!
//! Mention tokens are the literal pattern `@[Display Name]` embedded in
//! message text. While composing, the live query is the text between the
//! nearest `@` left of the caret and the caret itself, provided no
//! whitespace separates them.

use shared::{domain::UserId, protocol::ParticipantSummary};

/// An in-progress mention: the byte offset of the `@` and the query typed
/// so far. The offset is captured so a later insertion lands where the
/// token started, not wherever the caret has moved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionQuery {
    pub at_offset: usize,
    pub query: String,
}

/// Scan backward from the caret for an active mention query.
pub fn active_mention_query(text: &str, caret: usize) -> Option<MentionQuery> {
    let caret = caret.min(text.len());
    let before = &text[..caret];
    let at_offset = before.rfind('@')?;
    let candidate = &before[at_offset + 1..];
    // A half-typed token may already carry the opening bracket.
    let candidate = candidate.strip_prefix('[').unwrap_or(candidate);
    if candidate.chars().any(char::is_whitespace) {
        return None;
    }
    Some(MentionQuery {
        at_offset,
        query: candidate.to_string(),
    })
}

/// Roster entries matching the query: everyone but the viewer, filtered by
/// case-insensitive substring on display name.
pub fn suggestions<'a>(
    roster: &'a [ParticipantSummary],
    query: &str,
) -> Vec<&'a ParticipantSummary> {
    let needle = query.to_lowercase();
    roster
        .iter()
        .filter(|p| !p.is_self && p.display_name.to_lowercase().contains(&needle))
        .collect()
}

/// Splice the literal `@[Name] ` token over the active query, replacing
/// everything from the original `@` up to the caret. Returns the new text
/// and caret position.
pub fn insert_mention(
    text: &str,
    query: &MentionQuery,
    caret: usize,
    display_name: &str,
) -> (String, usize) {
    let caret = caret.min(text.len());
    let token = format!("@[{display_name}] ");
    let mut result = String::with_capacity(text.len() + token.len());
    result.push_str(&text[..query.at_offset]);
    result.push_str(&token);
    result.push_str(&text[caret..]);
    (result, query.at_offset + token.len())
}

/// Resolve every `@[Name]` token in the content to a participant id.
/// Names that match nobody in the roster are silently dropped; a bad
/// mention never fails the whole send.
pub fn extract_mention_ids(content: &str, roster: &[ParticipantSummary]) -> Vec<UserId> {
    let mut ids = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find("@[") {
        let after = &rest[start + 2..];
        let Some(end) = after.find(']') else {
            break;
        };
        let name = &after[..end];
        if let Some(participant) = roster.iter().find(|p| p.display_name == name) {
            ids.push(participant.id);
        }
        rest = &after[end + 1..];
    }
    ids
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn participant(name: &str, role: &str, is_self: bool) -> ParticipantSummary {
        ParticipantSummary {
            id: UserId(Uuid::new_v4()),
            display_name: name.into(),
            role: role.into(),
            is_self,
        }
    }

    #[test]
    fn query_is_text_between_at_and_caret() {
        let text = "Hello @Ali";
        let found = active_mention_query(text, text.len()).expect("query");
        assert_eq!(found.at_offset, 6);
        assert_eq!(found.query, "Ali");
    }

    #[test]
    fn opening_bracket_after_the_at_is_not_part_of_the_query() {
        let text = "Hello @[Alice";
        let found = active_mention_query(text, text.len()).expect("query");
        assert_eq!(found.at_offset, 6);
        assert_eq!(found.query, "Alice");
    }

    #[test]
    fn whitespace_between_at_and_caret_ends_the_query() {
        let text = "Hello @Ali how";
        assert_eq!(active_mention_query(text, text.len()), None);
        assert_eq!(active_mention_query("no mention here", 7), None);
    }

    #[test]
    fn suggestions_exclude_self_and_match_case_insensitively() {
        let roster = vec![
            participant("Alice Baker", "teacher", false),
            participant("Albert Fry", "student", false),
            participant("Alan Me", "student", true),
        ];
        let hits = suggestions(&roster, "al");
        let names: Vec<_> = hits.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, vec!["Alice Baker", "Albert Fry"]);
        assert!(suggestions(&roster, "zzz").is_empty());
    }

    #[test]
    fn insert_splices_token_at_original_at_offset() {
        let text = "Hello @Ali";
        let query = active_mention_query(text, text.len()).expect("query");
        let (updated, caret) = insert_mention(text, &query, text.len(), "Alice Baker");
        assert_eq!(updated, "Hello @[Alice Baker] ");
        assert_eq!(caret, updated.len());
    }

    #[test]
    fn insert_preserves_text_after_the_caret() {
        let text = "Hi @Al, see attachment";
        let caret = 6; // right after "Al"
        let query = active_mention_query(text, caret).expect("query");
        let (updated, _) = insert_mention(text, &query, caret, "Alice Baker");
        assert_eq!(updated, "Hi @[Alice Baker] , see attachment");
    }

    #[test]
    fn extract_resolves_known_names_and_drops_unknown() {
        let alice = participant("Alice Baker", "teacher", false);
        let roster = vec![alice.clone(), participant("Bob", "student", false)];
        let ids = extract_mention_ids("ping @[Alice Baker] and @[Charlie]", &roster);
        assert_eq!(ids, vec![alice.id]);
    }
}
