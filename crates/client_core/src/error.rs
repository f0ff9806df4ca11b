use shared::domain::ThreadStatus;
use thiserror::Error;

use crate::voice::VoiceError;

/// User-facing failures of portal client operations.
///
/// Precondition variants are raised before any network call is attempted;
/// `Transport` and `Api` surface after one. Concurrency guards (duplicate
/// send, duplicate recording start) are deliberate no-ops and never appear
/// here.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server url must start with http:// or https://: {0}")]
    InvalidServerUrl(String),
    #[error("session credential missing; reload the portal and sign in again")]
    MissingCsrfToken,
    #[error("not connected to a portal session")]
    NotConnected,
    #[error("unknown thread")]
    UnknownThread,
    #[error("thread is {status}; no further messages can be sent")]
    ThreadNotActive { status: ThreadStatus },
    #[error("cannot mark a {status} thread as {target}")]
    InvalidStatusTransition {
        status: ThreadStatus,
        target: ThreadStatus,
    },
    #[error("you do not have permission to {action}")]
    PermissionDenied { action: &'static str },
    /// Server-provided error message, surfaced verbatim.
    #[error("{0}")]
    Api(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Voice(#[from] VoiceError),
}
