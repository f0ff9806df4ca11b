use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(ThreadId);
id_newtype!(MessageId);
id_newtype!(UserId);
id_newtype!(AttachmentId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadKind {
    Assignment,
    Invoice,
    General,
    Support,
}

impl ThreadKind {
    pub fn label(self) -> &'static str {
        match self {
            ThreadKind::Assignment => "assignment",
            ThreadKind::Invoice => "invoice",
            ThreadKind::General => "general",
            ThreadKind::Support => "support",
        }
    }
}

/// Thread lifecycle. Transitions are monotonic: active -> resolved -> closed,
/// and closed is terminal. The server is authoritative; these helpers are the
/// client-side affordance checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Active,
    Resolved,
    Closed,
}

impl ThreadStatus {
    pub fn is_active(self) -> bool {
        matches!(self, ThreadStatus::Active)
    }

    /// Whether the "mark resolved" action is offered for this status.
    pub fn can_resolve(self) -> bool {
        matches!(self, ThreadStatus::Active)
    }

    /// Whether the "close" action is offered for this status.
    pub fn can_close(self) -> bool {
        !matches!(self, ThreadStatus::Closed)
    }

    pub fn label(self) -> &'static str {
        match self {
            ThreadStatus::Active => "active",
            ThreadStatus::Resolved => "resolved",
            ThreadStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Target of a status update. Threads are never moved back to active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTarget {
    Resolved,
    Closed,
}

impl StatusTarget {
    pub fn as_status(self) -> ThreadStatus {
        match self {
            StatusTarget::Resolved => ThreadStatus::Resolved,
            StatusTarget::Closed => ThreadStatus::Closed,
        }
    }

    pub fn label(self) -> &'static str {
        self.as_status().label()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    Admin,
    CsRep,
    Teacher,
    Student,
}

impl ViewerRole {
    /// Roles allowed to change thread status or create threads.
    pub fn is_privileged(self) -> bool {
        matches!(self, ViewerRole::Admin | ViewerRole::CsRep)
    }

    /// Thread deletion is restricted further than status changes.
    pub fn can_delete_threads(self) -> bool {
        matches!(self, ViewerRole::Admin)
    }
}
