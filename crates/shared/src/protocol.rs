use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AttachmentId, MessageId, ThreadId, ThreadKind, ThreadStatus, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: UserId,
    #[serde(rename = "name")]
    pub display_name: String,
    pub role: String,
    #[serde(rename = "is_me", default)]
    pub is_self: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: ThreadId,
    pub subject: String,
    #[serde(rename = "thread_type")]
    pub kind: ThreadKind,
    pub status: ThreadStatus,
    pub participants: Vec<ParticipantSummary>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub last_message_preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_code: Option<String>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    File,
    Audio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AttachmentId>,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: MessageId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub sender_role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentPayload>,
    #[serde(default)]
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    /// Push payloads may omit this; the client derives it from the viewer id.
    #[serde(rename = "is_me", default, skip_serializing_if = "Option::is_none")]
    pub is_self: Option<bool>,
}

/// Frames pushed on the per-thread socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadEvent {
    Message {
        message: MessagePayload,
    },
    Typing {
        user_id: UserId,
        user_name: String,
        is_typing: bool,
    },
}

/// Frames pushed on the list-scope socket. The update carries no payload
/// detail; receivers must refetch the whole filtered set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListEvent {
    ThreadListUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListThreadsResponse {
    pub success: bool,
    #[serde(default)]
    pub threads: Vec<ThreadSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadDetailResponse {
    pub success: bool,
    pub status: ThreadStatus,
    #[serde(default)]
    pub participants: Vec<ParticipantSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub success: bool,
    #[serde(default)]
    pub messages: Vec<MessagePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ThreadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThreadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientCandidate {
    pub id: UserId,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientsResponse {
    #[serde(default)]
    pub users: Vec<RecipientCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRef {
    pub id: String,
    pub assignment_code: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentsResponse {
    #[serde(default)]
    pub assignments: Vec<AssignmentRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRef {
    pub id: String,
    pub amount: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicesResponse {
    #[serde(default)]
    pub invoices: Vec<InvoiceRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_event_parses_message_frame() {
        let raw = r#"{
            "type": "message",
            "message": {
                "id": "6e1cb26a-8c4f-4f87-9e65-0a8f4a1d2b3c",
                "sender_id": "0d4e0c7e-1111-4222-8333-444455556666",
                "sender_name": "Alice Baker",
                "sender_role": "teacher",
                "content": "hello",
                "created_at": "2024-05-01T10:15:00Z"
            }
        }"#;
        let event: ThreadEvent = serde_json::from_str(raw).expect("parse");
        match event {
            ThreadEvent::Message { message } => {
                assert_eq!(message.content, "hello");
                assert!(message.attachments.is_empty());
                assert_eq!(message.is_self, None);
                assert!(!message.is_system);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn thread_event_parses_typing_frame() {
        let raw = r#"{
            "type": "typing",
            "user_id": "0d4e0c7e-1111-4222-8333-444455556666",
            "user_name": "Alice Baker",
            "is_typing": true
        }"#;
        let event: ThreadEvent = serde_json::from_str(raw).expect("parse");
        assert!(matches!(event, ThreadEvent::Typing { is_typing: true, .. }));
    }

    #[test]
    fn list_event_parses_update_frame() {
        let event: ListEvent =
            serde_json::from_str(r#"{"type": "thread_list_update"}"#).expect("parse");
        assert!(matches!(event, ListEvent::ThreadListUpdate));
    }

    #[test]
    fn attachment_kind_uses_wire_type_field() {
        let raw = r#"{"type": "audio", "name": "voicemail.webm", "url": "/media/v.webm", "duration_ms": 1200}"#;
        let attachment: AttachmentPayload = serde_json::from_str(raw).expect("parse");
        assert_eq!(attachment.kind, AttachmentKind::Audio);
        assert_eq!(attachment.duration_ms, Some(1200));
    }
}
