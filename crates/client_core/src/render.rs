//! Pure render pipeline: wire payloads in, display-ready view structs out.
//! No I/O and no client state; the shell maps these onto whatever surface
//! it draws.

use shared::{
    domain::UserId,
    protocol::{AttachmentKind, MessagePayload, ThreadSummary},
};

use crate::attachments::StagedAttachment;

/// One thread-list card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadCardView {
    pub kind_label: String,
    pub status_label: String,
    pub show_new_badge: bool,
    pub subject: String,
    pub preview: String,
    pub participant_line: String,
    pub assignment_line: Option<String>,
    pub created_by: String,
    pub updated_label: String,
}

impl ThreadCardView {
    pub fn from_summary(thread: &ThreadSummary) -> Self {
        let participant_line = thread
            .participants
            .iter()
            .map(|p| {
                if p.is_self {
                    "You".to_string()
                } else {
                    p.display_name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let preview = if thread.last_message_preview.is_empty() {
            "No messages yet".to_string()
        } else {
            thread.last_message_preview.clone()
        };
        Self {
            kind_label: thread.kind.label().to_uppercase(),
            status_label: thread.status.label().to_uppercase(),
            show_new_badge: thread.unread_count > 0,
            subject: thread.subject.clone(),
            preview,
            participant_line,
            assignment_line: thread
                .assignment_code
                .as_ref()
                .map(|code| format!("Assignment: {code}")),
            created_by: thread.created_by.clone(),
            updated_label: thread.updated_at.format("%H:%M").to_string(),
        }
    }
}

/// Which side of the conversation a message sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageAlignment {
    Viewer,
    Other,
    System,
}

/// Message text split around `@[Name]` mention tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSegment {
    Text(String),
    Mention(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentView {
    File { name: String, url: String },
    Voice { url: String, label: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub alignment: MessageAlignment,
    pub sender_line: String,
    pub segments: Vec<MessageSegment>,
    pub attachments: Vec<AttachmentView>,
    pub time_label: String,
}

impl MessageView {
    /// Push payloads may omit the viewer flag, so it is derived from the
    /// sender id when absent.
    pub fn from_message(message: &MessagePayload, viewer_id: UserId) -> Self {
        let is_viewer = message
            .is_self
            .unwrap_or(message.sender_id == viewer_id);
        let alignment = if message.is_system {
            MessageAlignment::System
        } else if is_viewer {
            MessageAlignment::Viewer
        } else {
            MessageAlignment::Other
        };
        let attachments = message
            .attachments
            .iter()
            .map(|a| match a.kind {
                AttachmentKind::Audio => AttachmentView::Voice {
                    url: a.url.clone(),
                    label: match a.duration_ms {
                        Some(ms) => format!("Voicemail \u{b7} {}", format_duration(ms)),
                        None => "Voicemail".to_string(),
                    },
                },
                AttachmentKind::File => AttachmentView::File {
                    name: a.name.clone(),
                    url: a.url.clone(),
                },
            })
            .collect();
        Self {
            alignment,
            sender_line: format!("{} ({})", message.sender_name, message.sender_role),
            segments: mention_segments(&message.content),
            attachments,
            time_label: message.created_at.format("%H:%M").to_string(),
        }
    }
}

/// Composer preview entry: file name plus human-readable size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAttachmentView {
    pub name: String,
    pub size_label: String,
}

impl StagedAttachmentView {
    pub fn from_staged(staged: &StagedAttachment) -> Self {
        Self {
            name: staged.name.clone(),
            size_label: format_bytes(staged.byte_size),
        }
    }
}

/// Split message content around `@[Name]` tokens. Unterminated tokens are
/// left as plain text.
pub fn mention_segments(content: &str) -> Vec<MessageSegment> {
    let mut segments = Vec::new();
    let mut rest = content;
    loop {
        let Some(start) = rest.find("@[") else {
            break;
        };
        let after = &rest[start + 2..];
        let Some(end) = after.find(']') else {
            break;
        };
        if start > 0 {
            segments.push(MessageSegment::Text(rest[..start].to_string()));
        }
        segments.push(MessageSegment::Mention(after[..end].to_string()));
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        segments.push(MessageSegment::Text(rest.to_string()));
    }
    segments
}

/// Human-readable byte count: one decimal below 10, none at or above, with
/// B/KB/MB/GB units.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    if value >= 10.0 || exponent == 0 {
        format!("{} {}", value.round() as u64, UNITS[exponent])
    } else {
        format!("{value:.1} {}", UNITS[exponent])
    }
}

fn format_duration(ms: u32) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shared::{
        domain::{MessageId, ThreadId, ThreadKind, ThreadStatus},
        protocol::{AttachmentPayload, ParticipantSummary},
    };
    use uuid::Uuid;

    use super::*;

    fn summary() -> ThreadSummary {
        ThreadSummary {
            id: ThreadId(Uuid::new_v4()),
            subject: "Algebra homework".into(),
            kind: ThreadKind::Assignment,
            status: ThreadStatus::Active,
            participants: vec![
                ParticipantSummary {
                    id: UserId(Uuid::new_v4()),
                    display_name: "Alice Baker".into(),
                    role: "teacher".into(),
                    is_self: false,
                },
                ParticipantSummary {
                    id: UserId(Uuid::new_v4()),
                    display_name: "Me Myself".into(),
                    role: "student".into(),
                    is_self: true,
                },
            ],
            unread_count: 2,
            last_message_preview: String::new(),
            assignment_code: Some("ALG-101".into()),
            created_by: "CS Rep".into(),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        }
    }

    fn message(content: &str, sender: UserId) -> MessagePayload {
        MessagePayload {
            id: MessageId(Uuid::new_v4()),
            sender_id: sender,
            sender_name: "Alice Baker".into(),
            sender_role: "teacher".into(),
            content: content.into(),
            attachments: Vec::new(),
            is_system: false,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 5, 0).unwrap(),
            is_self: None,
        }
    }

    #[test]
    fn card_shows_new_badge_fallback_preview_and_you() {
        let card = ThreadCardView::from_summary(&summary());
        assert!(card.show_new_badge);
        assert_eq!(card.kind_label, "ASSIGNMENT");
        assert_eq!(card.status_label, "ACTIVE");
        assert_eq!(card.preview, "No messages yet");
        assert_eq!(card.participant_line, "Alice Baker, You");
        assert_eq!(card.assignment_line.as_deref(), Some("Assignment: ALG-101"));
        assert_eq!(card.updated_label, "09:30");
    }

    #[test]
    fn card_without_unread_or_assignment_omits_both() {
        let mut thread = summary();
        thread.unread_count = 0;
        thread.assignment_code = None;
        thread.last_message_preview = "See you at 5".into();
        let card = ThreadCardView::from_summary(&thread);
        assert!(!card.show_new_badge);
        assert_eq!(card.assignment_line, None);
        assert_eq!(card.preview, "See you at 5");
    }

    #[test]
    fn alignment_derived_from_sender_when_flag_absent() {
        let viewer = UserId(Uuid::new_v4());
        let own = message("hi", viewer);
        assert_eq!(
            MessageView::from_message(&own, viewer).alignment,
            MessageAlignment::Viewer
        );

        let other = message("hi", UserId(Uuid::new_v4()));
        assert_eq!(
            MessageView::from_message(&other, viewer).alignment,
            MessageAlignment::Other
        );

        let mut system = message("thread resolved", UserId(Uuid::new_v4()));
        system.is_system = true;
        assert_eq!(
            MessageView::from_message(&system, viewer).alignment,
            MessageAlignment::System
        );
    }

    #[test]
    fn explicit_viewer_flag_wins_over_sender_id() {
        let viewer = UserId(Uuid::new_v4());
        let mut msg = message("hi", UserId(Uuid::new_v4()));
        msg.is_self = Some(true);
        assert_eq!(
            MessageView::from_message(&msg, viewer).alignment,
            MessageAlignment::Viewer
        );
    }

    #[test]
    fn mention_segments_split_around_tokens() {
        let segments = mention_segments("ping @[Alice Baker], see @[Bob] later");
        assert_eq!(
            segments,
            vec![
                MessageSegment::Text("ping ".into()),
                MessageSegment::Mention("Alice Baker".into()),
                MessageSegment::Text(", see ".into()),
                MessageSegment::Mention("Bob".into()),
                MessageSegment::Text(" later".into()),
            ]
        );
        assert_eq!(
            mention_segments("no tokens"),
            vec![MessageSegment::Text("no tokens".into())]
        );
        assert!(mention_segments("").is_empty());
    }

    #[test]
    fn voice_attachment_renders_duration_label() {
        let viewer = UserId(Uuid::new_v4());
        let mut msg = message("", UserId(Uuid::new_v4()));
        msg.attachments = vec![AttachmentPayload {
            id: None,
            kind: AttachmentKind::Audio,
            name: "voicemail.webm".into(),
            url: "/media/v.webm".into(),
            duration_ms: Some(65_000),
        }];
        let view = MessageView::from_message(&msg, viewer);
        assert_eq!(
            view.attachments,
            vec![AttachmentView::Voice {
                url: "/media/v.webm".into(),
                label: "Voicemail \u{b7} 1:05".into(),
            }]
        );
        assert_eq!(view.time_label, "10:05");
    }

    #[test]
    fn format_bytes_matches_display_convention() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2_560), "2.5 KB");
        assert_eq!(format_bytes(10 * 1024), "10 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn staged_preview_carries_human_size() {
        let staged = StagedAttachment::file("report.pdf", 7, vec![0u8; 2_560]);
        let view = StagedAttachmentView::from_staged(&staged);
        assert_eq!(view.name, "report.pdf");
        assert_eq!(view.size_label, "2.5 KB");
    }
}
