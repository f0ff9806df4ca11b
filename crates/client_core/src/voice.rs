//! Voice capture pipeline: a small state machine around a microphone
//! resource that produces one audio clip per recording session.
//!
//! Idle -> (start) -> Recording -> (stop) -> Finalizing -> Idle. The
//! microphone handle is owned for the duration of one recording only and
//! released unconditionally on stop.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

/// Recordings shorter than this are treated as accidental taps and never
/// reach the send step.
pub const MIN_CLIP_DURATION: Duration = Duration::from_millis(500);
/// Server-enforced voicemail cap, checked locally before upload.
pub const MAX_VOICEMAIL_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error("microphone access denied")]
    MicrophoneDenied,
    #[error("microphone unavailable: {0}")]
    MicrophoneUnavailable(String),
    #[error("recording is empty; try recording again")]
    EmptyClip,
    #[error("recording is too large; voicemails are capped at {max_bytes} bytes")]
    ClipTooLarge { size_bytes: usize, max_bytes: usize },
}

#[async_trait]
pub trait MicrophoneSource: Send + Sync {
    async fn open(&self) -> Result<Box<dyn MicrophoneHandle>, VoiceError>;
}

#[async_trait]
pub trait MicrophoneHandle: Send {
    /// Drain whatever audio has been captured since the last call.
    async fn drain_chunks(&mut self) -> Vec<Vec<u8>>;
    /// Release the device. Called on every stop path.
    async fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Finalizing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceClip {
    pub bytes: Vec<u8>,
    pub duration: Duration,
}

impl VoiceClip {
    /// Local upload preconditions, checked before any network call.
    pub fn validate_for_upload(&self) -> Result<(), VoiceError> {
        if self.bytes.is_empty() {
            return Err(VoiceError::EmptyClip);
        }
        if self.bytes.len() > MAX_VOICEMAIL_BYTES {
            return Err(VoiceError::ClipTooLarge {
                size_bytes: self.bytes.len(),
                max_bytes: MAX_VOICEMAIL_BYTES,
            });
        }
        Ok(())
    }
}

/// Collapse captured chunks into one clip; sub-threshold durations are
/// discarded as accidental taps.
pub fn finalize_clip(chunks: Vec<Vec<u8>>, duration: Duration) -> Option<VoiceClip> {
    if duration < MIN_CLIP_DURATION {
        return None;
    }
    let bytes: Vec<u8> = chunks.into_iter().flatten().collect();
    Some(VoiceClip { bytes, duration })
}

pub struct VoiceRecorder {
    state: RecorderState,
    handle: Option<Box<dyn MicrophoneHandle>>,
    chunks: Vec<Vec<u8>>,
    started_at: Option<Instant>,
}

impl Default for VoiceRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceRecorder {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            handle: None,
            chunks: Vec::new(),
            started_at: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Acquire the microphone and begin capturing. A start while already
    /// recording is a user double-action and silently no-ops (`Ok(false)`).
    /// An acquisition failure leaves the recorder Idle.
    pub async fn start(&mut self, source: &dyn MicrophoneSource) -> Result<bool, VoiceError> {
        if self.state != RecorderState::Idle {
            return Ok(false);
        }
        let handle = source.open().await?;
        self.handle = Some(handle);
        self.chunks.clear();
        self.started_at = Some(Instant::now());
        self.state = RecorderState::Recording;
        Ok(true)
    }

    /// Pull captured audio from the device into the in-memory buffer.
    pub async fn poll(&mut self) {
        if self.state != RecorderState::Recording {
            return;
        }
        if let Some(handle) = self.handle.as_mut() {
            self.chunks.extend(handle.drain_chunks().await);
        }
    }

    /// Stop recording. The microphone is released unconditionally; the
    /// accumulated chunks become a clip unless the recording was too short.
    pub async fn stop(&mut self) -> Option<VoiceClip> {
        if self.state != RecorderState::Recording {
            return None;
        }
        self.state = RecorderState::Finalizing;

        let duration = self
            .started_at
            .take()
            .map(|t| t.elapsed())
            .unwrap_or_default();
        if let Some(mut handle) = self.handle.take() {
            self.chunks.extend(handle.drain_chunks().await);
            handle.close().await;
        }
        let clip = finalize_clip(std::mem::take(&mut self.chunks), duration);

        self.state = RecorderState::Idle;
        clip
    }
}

#[cfg(test)]
#[path = "tests/voice_tests.rs"]
mod tests;
