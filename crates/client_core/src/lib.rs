//! Realtime threaded-messaging client for the tutoring portal.
//!
//! `PortalClient` owns the thread-list cache, the open-thread message
//! cache, and the two push channels (list scope and per-thread). Callers
//! hold it behind an `Arc`, drive it with async operations, and observe it
//! through a broadcast stream of [`ClientEvent`]s. Composer, stager,
//! recorder, and render views are separate pieces wired in by the shell.

use std::{collections::HashSet, sync::Arc};

use reqwest::{multipart, Client};
use shared::{
    domain::{MessageId, StatusTarget, ThreadId, ThreadStatus, UserId, ViewerRole},
    protocol::{
        AssignmentRef, AssignmentsResponse, CreateThreadResponse, InvoiceRef, InvoicesResponse,
        ListThreadsResponse, MessagePayload, MessagesResponse, ParticipantSummary,
        RecipientCandidate, RecipientsResponse, SendResponse, StatusUpdateResponse,
        ThreadDetailResponse, ThreadSummary,
    },
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

pub mod attachments;
pub mod composer;
pub mod error;
pub mod mention;
pub mod render;
pub mod store;
pub mod sync;
pub mod voice;

pub use composer::{Composer, ComposerError, OutgoingMessage};
pub use error::ClientError;
pub use store::{ThreadFilter, ThreadStore};
pub use voice::{VoiceClip, VoiceError, VoiceRecorder};

use attachments::StagedKind;

const CSRF_HEADER: &str = "X-CSRFToken";

/// Credentials and identity for one signed-in portal session. The hosting
/// shell obtains these; the client never negotiates them itself.
#[derive(Debug, Clone)]
pub struct PortalSession {
    pub server_url: String,
    /// Required for every mutating call; its absence fails locally.
    pub csrf_token: Option<String>,
    pub viewer_id: UserId,
    pub viewer_role: ViewerRole,
}

/// A new thread to create. Only privileged roles may submit one.
#[derive(Debug, Clone)]
pub struct NewThread {
    pub subject: String,
    pub kind: shared::domain::ThreadKind,
    pub initial_message: String,
    pub recipients: Vec<UserId>,
    pub assignment_id: Option<String>,
    pub invoice_id: Option<String>,
}

/// State of the currently open thread, as handed to the shell.
#[derive(Debug, Clone)]
pub struct OpenThreadSnapshot {
    pub thread_id: ThreadId,
    pub status: ThreadStatus,
    pub participants: Vec<ParticipantSummary>,
    pub assignment_code: Option<String>,
    pub messages: Vec<MessagePayload>,
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    ThreadListReplaced {
        threads: Vec<ThreadSummary>,
    },
    ThreadOpened {
        snapshot: OpenThreadSnapshot,
    },
    ThreadClosed {
        thread_id: ThreadId,
    },
    MessageAppended {
        thread_id: ThreadId,
        message: MessagePayload,
    },
    ParticipantTyping {
        thread_id: ThreadId,
        user_id: UserId,
        user_name: String,
        is_typing: bool,
    },
    StatusChanged {
        thread_id: ThreadId,
        status: ThreadStatus,
    },
    ThreadDeleted {
        thread_id: ThreadId,
    },
    ThreadCreated {
        thread_id: Option<ThreadId>,
    },
    Error(String),
}

struct OpenThread {
    thread_id: ThreadId,
    status: ThreadStatus,
    participants: Vec<ParticipantSummary>,
    assignment_code: Option<String>,
    messages: Vec<MessagePayload>,
    /// Ids already in the cache; covers push + defensive-refetch double
    /// delivery.
    seen: HashSet<MessageId>,
}

impl OpenThread {
    fn snapshot(&self) -> OpenThreadSnapshot {
        OpenThreadSnapshot {
            thread_id: self.thread_id,
            status: self.status,
            participants: self.participants.clone(),
            assignment_code: self.assignment_code.clone(),
            messages: self.messages.clone(),
        }
    }
}

struct ActiveThreadChannel {
    thread_id: ThreadId,
    task: JoinHandle<()>,
}

struct PortalClientState {
    session: Option<PortalSession>,
    store: ThreadStore,
    last_filter: ThreadFilter,
    /// Bumped per refresh; a response is applied only if its generation is
    /// still the latest when it lands.
    refresh_generation: u64,
    open_thread: Option<OpenThread>,
    send_in_flight: bool,
    voice_in_flight: bool,
    create_in_flight: bool,
}

pub struct PortalClient {
    http: Client,
    inner: Mutex<PortalClientState>,
    list_channel: Mutex<Option<JoinHandle<()>>>,
    thread_channel: Mutex<Option<ActiveThreadChannel>>,
    events: broadcast::Sender<ClientEvent>,
}

impl PortalClient {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            http: Client::new(),
            inner: Mutex::new(PortalClientState {
                session: None,
                store: ThreadStore::new(),
                last_filter: ThreadFilter::All,
                refresh_generation: 0,
                open_thread: None,
                send_in_flight: false,
                voice_in_flight: false,
                create_in_flight: false,
            }),
            list_channel: Mutex::new(None),
            thread_channel: Mutex::new(None),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Bind a session, start the list push channel, and load the initial
    /// thread list. A failed initial load leaves the session connected; the
    /// list channel keeps retrying and the caller may refresh again.
    pub async fn connect(self: &Arc<Self>, session: PortalSession) -> Result<(), ClientError> {
        let list_url = sync::websocket_url(&session.server_url, "/ws/thread-list/")?;
        {
            let mut guard = self.inner.lock().await;
            guard.session = Some(session);
            guard.store = ThreadStore::new();
            guard.last_filter = ThreadFilter::All;
            guard.open_thread = None;
        }

        let task = sync::spawn_list_channel(Arc::clone(self), list_url);
        if let Some(previous) = self.list_channel.lock().await.replace(task) {
            previous.abort();
        }

        self.refresh_threads(ThreadFilter::All).await
    }

    /// Tear the session down: both push channels stop and all cached state
    /// is dropped.
    pub async fn shutdown(&self) {
        {
            let mut guard = self.inner.lock().await;
            guard.session = None;
            guard.open_thread = None;
            guard.store = ThreadStore::new();
        }
        if let Some(task) = self.list_channel.lock().await.take() {
            task.abort();
        }
        if let Some(channel) = self.thread_channel.lock().await.take() {
            channel.task.abort();
        }
    }

    pub(crate) async fn is_session_open(&self) -> bool {
        self.inner.lock().await.session.is_some()
    }

    pub(crate) async fn is_thread_open(&self, thread_id: ThreadId) -> bool {
        self.inner
            .lock()
            .await
            .open_thread
            .as_ref()
            .is_some_and(|open| open.thread_id == thread_id)
    }

    async fn session(&self) -> Result<PortalSession, ClientError> {
        self.inner
            .lock()
            .await
            .session
            .clone()
            .ok_or(ClientError::NotConnected)
    }

    fn csrf(session: &PortalSession) -> Result<String, ClientError> {
        session
            .csrf_token
            .clone()
            .ok_or(ClientError::MissingCsrfToken)
    }

    /// Fetch the filtered thread list and swap the cache wholesale. A
    /// response that arrives after a newer refresh has started is discarded;
    /// a failed fetch leaves the previous cache intact.
    pub async fn refresh_threads(&self, filter: ThreadFilter) -> Result<(), ClientError> {
        let (server_url, generation) = {
            let mut guard = self.inner.lock().await;
            let session = guard.session.as_ref().ok_or(ClientError::NotConnected)?;
            let server_url = session.server_url.clone();
            guard.refresh_generation += 1;
            (server_url, guard.refresh_generation)
        };

        let mut request = self.http.get(format!("{server_url}/threads/api/list/"));
        if let Some(pair) = filter.query_pair() {
            request = request.query(&[pair]);
        }
        let response: ListThreadsResponse =
            request.send().await?.error_for_status()?.json().await?;
        if !response.success {
            return Err(ClientError::Api("failed to load threads".to_string()));
        }

        let threads = {
            let mut guard = self.inner.lock().await;
            if guard.refresh_generation != generation {
                info!(filter = filter.label(), "discarding stale thread list response");
                return Ok(());
            }
            guard.store.replace_all(response.threads);
            guard.last_filter = filter;
            guard.store.snapshot()
        };
        let _ = self.events.send(ClientEvent::ThreadListReplaced { threads });
        Ok(())
    }

    /// List-channel callback: refetch with whatever filter was last applied.
    pub(crate) async fn on_list_update(&self) {
        let filter = { self.inner.lock().await.last_filter };
        if let Err(err) = self.refresh_threads(filter).await {
            warn!("thread list refresh after push failed: {err}");
            let _ = self.events.send(ClientEvent::Error(err.to_string()));
        }
    }

    pub async fn thread_list(&self) -> Vec<ThreadSummary> {
        self.inner.lock().await.store.snapshot()
    }

    pub async fn last_filter(&self) -> ThreadFilter {
        self.inner.lock().await.last_filter
    }

    pub async fn open_thread_snapshot(&self) -> Option<OpenThreadSnapshot> {
        self.inner
            .lock()
            .await
            .open_thread
            .as_ref()
            .map(OpenThread::snapshot)
    }

    /// Open a thread from the cached list: close the previous thread
    /// channel, load detail and the full message snapshot, then attach the
    /// new push channel. An id not in the cache is a stale click and a
    /// no-op.
    pub async fn open_thread(self: &Arc<Self>, thread_id: ThreadId) -> Result<(), ClientError> {
        let (server_url, viewer_id, known) = {
            let guard = self.inner.lock().await;
            let session = guard.session.as_ref().ok_or(ClientError::NotConnected)?;
            (
                session.server_url.clone(),
                session.viewer_id,
                guard.store.get(thread_id).is_some(),
            )
        };
        if !known {
            warn!(thread_id = %thread_id, "ignoring open request for unknown thread");
            return Ok(());
        }

        self.close_thread().await;

        let detail: ThreadDetailResponse = self
            .http
            .get(format!("{server_url}/threads/api/{thread_id}/detail/"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !detail.success {
            return Err(ClientError::Api("failed to load thread detail".to_string()));
        }

        let messages: MessagesResponse = self
            .http
            .get(format!("{server_url}/threads/api/{thread_id}/messages/"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !messages.success {
            return Err(ClientError::Api("failed to load messages".to_string()));
        }

        let mut cache = messages.messages;
        for message in &mut cache {
            if message.is_self.is_none() {
                message.is_self = Some(message.sender_id == viewer_id);
            }
        }
        let seen: HashSet<MessageId> = cache.iter().map(|m| m.id).collect();
        let open = OpenThread {
            thread_id,
            status: detail.status,
            participants: detail.participants,
            assignment_code: detail.assignment_code,
            messages: cache,
            seen,
        };
        let snapshot = open.snapshot();
        {
            let mut guard = self.inner.lock().await;
            guard.open_thread = Some(open);
        }
        let _ = self.events.send(ClientEvent::ThreadOpened { snapshot });

        let ws_url = sync::websocket_url(&server_url, &format!("/ws/threads/{thread_id}/"))?;
        let task = sync::spawn_thread_channel(Arc::clone(self), thread_id, ws_url);
        let previous = self
            .thread_channel
            .lock()
            .await
            .replace(ActiveThreadChannel { thread_id, task });
        if let Some(channel) = previous {
            channel.task.abort();
        }
        Ok(())
    }

    /// Close the open thread, if any: the push channel is aborted and the
    /// message cache dropped.
    pub async fn close_thread(&self) {
        let closed = {
            let mut guard = self.inner.lock().await;
            guard.open_thread.take().map(|open| open.thread_id)
        };
        if let Some(channel) = self.thread_channel.lock().await.take() {
            channel.task.abort();
            info!(thread_id = %channel.thread_id, "thread channel closed");
        }
        if let Some(thread_id) = closed {
            let _ = self.events.send(ClientEvent::ThreadClosed { thread_id });
        }
    }

    /// Thread-channel callback for a pushed message. Appends in arrival
    /// order, deduplicating against the seen-set.
    pub(crate) async fn apply_pushed_message(&self, thread_id: ThreadId, message: MessagePayload) {
        let mut message = message;
        let appended = {
            let mut guard = self.inner.lock().await;
            let viewer_id = guard.session.as_ref().map(|s| s.viewer_id);
            match guard.open_thread.as_mut() {
                Some(open) if open.thread_id == thread_id => {
                    if open.seen.insert(message.id) {
                        if message.is_self.is_none() {
                            message.is_self = viewer_id.map(|v| v == message.sender_id);
                        }
                        open.messages.push(message.clone());
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            }
        };
        if appended {
            let _ = self
                .events
                .send(ClientEvent::MessageAppended { thread_id, message });
        }
    }

    /// Thread-channel callback for a typing frame. The viewer's own typing
    /// is never echoed back.
    pub(crate) async fn on_typing(
        &self,
        thread_id: ThreadId,
        user_id: UserId,
        user_name: String,
        is_typing: bool,
    ) {
        let viewer_id = {
            let guard = self.inner.lock().await;
            guard.session.as_ref().map(|s| s.viewer_id)
        };
        if viewer_id == Some(user_id) {
            return;
        }
        let _ = self.events.send(ClientEvent::ParticipantTyping {
            thread_id,
            user_id,
            user_name,
            is_typing,
        });
    }

    fn current_status(
        state: &PortalClientState,
        thread_id: ThreadId,
    ) -> Result<ThreadStatus, ClientError> {
        if let Some(open) = state.open_thread.as_ref() {
            if open.thread_id == thread_id {
                return Ok(open.status);
            }
        }
        state
            .store
            .get(thread_id)
            .map(|t| t.status)
            .ok_or(ClientError::UnknownThread)
    }

    /// Send a prepared message. Returns `Ok(false)` when another send is
    /// already in flight (silent no-op); the caller clears the composer only
    /// on `Ok(true)`. The draft and staged files survive every failure.
    pub async fn send_message(
        &self,
        thread_id: ThreadId,
        outgoing: OutgoingMessage,
    ) -> Result<bool, ClientError> {
        let (server_url, csrf) = {
            let mut guard = self.inner.lock().await;
            let session = guard.session.as_ref().ok_or(ClientError::NotConnected)?;
            let csrf = Self::csrf(session)?;
            let server_url = session.server_url.clone();
            let status = Self::current_status(&guard, thread_id)?;
            if !status.is_active() {
                return Err(ClientError::ThreadNotActive { status });
            }
            if guard.send_in_flight {
                info!(thread_id = %thread_id, "send already in flight; ignoring");
                return Ok(false);
            }
            guard.send_in_flight = true;
            (server_url, csrf)
        };

        let result = async {
            let mut form = multipart::Form::new().text("content", outgoing.content.clone());
            for mention in &outgoing.mention_ids {
                form = form.text("mentions", mention.to_string());
            }
            for staged in &outgoing.attachments {
                let part =
                    multipart::Part::bytes(staged.data.clone()).file_name(staged.name.clone());
                let part = match staged.kind {
                    StagedKind::Voice => part.mime_str("audio/webm")?,
                    StagedKind::File => part,
                };
                form = form.part("files", part);
            }
            let response: SendResponse = self
                .http
                .post(format!("{server_url}/threads/api/{thread_id}/send/"))
                .header(CSRF_HEADER, &csrf)
                .multipart(form)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            if response.success {
                Ok(())
            } else {
                Err(ClientError::Api(response.error.unwrap_or_else(|| {
                    "Failed to send message. Please try again.".to_string()
                })))
            }
        }
        .await;

        self.inner.lock().await.send_in_flight = false;
        result?;

        // The push channel normally delivers the new message; refetch so it
        // shows up even when the socket is down. Dedup makes this safe.
        if let Err(err) = self.refetch_open_thread(thread_id).await {
            warn!(thread_id = %thread_id, "post-send refetch failed: {err}");
        }
        Ok(true)
    }

    /// Upload a finished voice clip as a voicemail message. Holds its own
    /// single-flight guard so the record control stays disabled for exactly
    /// one upload.
    pub async fn send_voicemail(
        &self,
        thread_id: ThreadId,
        clip: VoiceClip,
    ) -> Result<bool, ClientError> {
        clip.validate_for_upload()?;
        let (server_url, csrf) = {
            let mut guard = self.inner.lock().await;
            let session = guard.session.as_ref().ok_or(ClientError::NotConnected)?;
            let csrf = Self::csrf(session)?;
            let server_url = session.server_url.clone();
            let status = Self::current_status(&guard, thread_id)?;
            if !status.is_active() {
                return Err(ClientError::ThreadNotActive { status });
            }
            if guard.voice_in_flight {
                info!(thread_id = %thread_id, "voicemail upload already in flight; ignoring");
                return Ok(false);
            }
            guard.voice_in_flight = true;
            (server_url, csrf)
        };

        let duration_ms = clip.duration.as_millis().to_string();
        let result = async {
            let part = multipart::Part::bytes(clip.bytes)
                .file_name("voicemail.webm")
                .mime_str("audio/webm")?;
            let form = multipart::Form::new()
                .part("voice", part)
                .text("duration_ms", duration_ms);
            let response: SendResponse = self
                .http
                .post(format!("{server_url}/threads/api/{thread_id}/send/"))
                .header(CSRF_HEADER, &csrf)
                .multipart(form)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            if response.success {
                Ok(())
            } else {
                Err(ClientError::Api(response.error.unwrap_or_else(|| {
                    "Failed to send voicemail. Please try again.".to_string()
                })))
            }
        }
        .await;

        self.inner.lock().await.voice_in_flight = false;
        result?;

        if let Err(err) = self.refetch_open_thread(thread_id).await {
            warn!(thread_id = %thread_id, "post-voicemail refetch failed: {err}");
        }
        Ok(true)
    }

    /// Refetch the open thread's messages and append anything the push
    /// channel has not delivered yet.
    async fn refetch_open_thread(&self, thread_id: ThreadId) -> Result<(), ClientError> {
        let server_url = {
            let guard = self.inner.lock().await;
            let still_open = guard
                .open_thread
                .as_ref()
                .is_some_and(|open| open.thread_id == thread_id);
            if !still_open {
                return Ok(());
            }
            guard
                .session
                .as_ref()
                .map(|s| s.server_url.clone())
                .ok_or(ClientError::NotConnected)?
        };

        let response: MessagesResponse = self
            .http
            .get(format!("{server_url}/threads/api/{thread_id}/messages/"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.success {
            return Ok(());
        }

        let fresh = {
            let mut guard = self.inner.lock().await;
            let viewer_id = guard.session.as_ref().map(|s| s.viewer_id);
            let Some(open) = guard.open_thread.as_mut() else {
                return Ok(());
            };
            if open.thread_id != thread_id {
                return Ok(());
            }
            let mut fresh = Vec::new();
            for mut message in response.messages {
                if open.seen.insert(message.id) {
                    if message.is_self.is_none() {
                        message.is_self = viewer_id.map(|v| v == message.sender_id);
                    }
                    open.messages.push(message.clone());
                    fresh.push(message);
                }
            }
            fresh
        };
        for message in fresh {
            let _ = self
                .events
                .send(ClientEvent::MessageAppended { thread_id, message });
        }
        Ok(())
    }

    /// Move a thread along its lifecycle. Privileged roles only; the server
    /// remains the authority and its error text is surfaced verbatim.
    pub async fn update_status(
        &self,
        thread_id: ThreadId,
        target: StatusTarget,
    ) -> Result<(), ClientError> {
        let (server_url, csrf, filter) = {
            let guard = self.inner.lock().await;
            let session = guard.session.as_ref().ok_or(ClientError::NotConnected)?;
            if !session.viewer_role.is_privileged() {
                return Err(ClientError::PermissionDenied {
                    action: "update thread status",
                });
            }
            let csrf = Self::csrf(session)?;
            let status = Self::current_status(&guard, thread_id)?;
            let allowed = match target {
                StatusTarget::Resolved => status.can_resolve(),
                StatusTarget::Closed => status.can_close(),
            };
            if !allowed {
                return Err(ClientError::InvalidStatusTransition {
                    status,
                    target: target.as_status(),
                });
            }
            (session.server_url.clone(), csrf, guard.last_filter)
        };

        let response: StatusUpdateResponse = self
            .http
            .post(format!("{server_url}/threads/api/{thread_id}/status/"))
            .header(CSRF_HEADER, &csrf)
            .form(&[("status", target.label())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.success {
            return Err(ClientError::Api(response.error.unwrap_or_else(|| {
                "Failed to update thread status.".to_string()
            })));
        }

        let status = response.status.unwrap_or_else(|| target.as_status());
        {
            let mut guard = self.inner.lock().await;
            guard.store.set_status(thread_id, status);
            if let Some(open) = guard.open_thread.as_mut() {
                if open.thread_id == thread_id {
                    open.status = status;
                }
            }
        }
        let _ = self
            .events
            .send(ClientEvent::StatusChanged { thread_id, status });

        if let Err(err) = self.refresh_threads(filter).await {
            warn!("thread list refresh after status change failed: {err}");
        }
        Ok(())
    }

    /// Delete a thread. Admin only; the confirmation step happens in the
    /// shell before this is called.
    pub async fn delete_thread(&self, thread_id: ThreadId) -> Result<(), ClientError> {
        let (server_url, csrf) = {
            let guard = self.inner.lock().await;
            let session = guard.session.as_ref().ok_or(ClientError::NotConnected)?;
            if !session.viewer_role.can_delete_threads() {
                return Err(ClientError::PermissionDenied {
                    action: "delete threads",
                });
            }
            let csrf = Self::csrf(session)?;
            (session.server_url.clone(), csrf)
        };

        let response: SendResponse = self
            .http
            .post(format!("{server_url}/threads/api/{thread_id}/delete/"))
            .header(CSRF_HEADER, &csrf)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.success {
            return Err(ClientError::Api(response.error.unwrap_or_else(|| {
                "Failed to delete thread.".to_string()
            })));
        }

        let was_open = {
            let mut guard = self.inner.lock().await;
            guard.store.remove(thread_id);
            guard
                .open_thread
                .as_ref()
                .is_some_and(|open| open.thread_id == thread_id)
        };
        if was_open {
            self.close_thread().await;
        }
        let _ = self.events.send(ClientEvent::ThreadDeleted { thread_id });
        Ok(())
    }

    /// Create a new thread with its initial message and recipients.
    /// Returns `Ok(None)` when a creation is already in flight.
    pub async fn create_thread(
        &self,
        new_thread: NewThread,
    ) -> Result<Option<ThreadId>, ClientError> {
        let (server_url, csrf, filter) = {
            let mut guard = self.inner.lock().await;
            let session = guard.session.as_ref().ok_or(ClientError::NotConnected)?;
            if !session.viewer_role.is_privileged() {
                return Err(ClientError::PermissionDenied {
                    action: "create threads",
                });
            }
            let csrf = Self::csrf(session)?;
            let server_url = session.server_url.clone();
            if guard.create_in_flight {
                info!("thread creation already in progress; ignoring");
                return Ok(None);
            }
            guard.create_in_flight = true;
            (server_url, csrf, guard.last_filter)
        };

        let result = async {
            let mut form = multipart::Form::new()
                .text("threadSubject", new_thread.subject.clone())
                .text("threadType", new_thread.kind.label())
                .text("threadMessage", new_thread.initial_message.clone());
            for recipient in &new_thread.recipients {
                form = form.text("threadRecipient", recipient.to_string());
            }
            if let Some(assignment_id) = &new_thread.assignment_id {
                form = form.text("relatedAssignment", assignment_id.clone());
            }
            if let Some(invoice_id) = &new_thread.invoice_id {
                form = form.text("relatedInvoice", invoice_id.clone());
            }
            let response: CreateThreadResponse = self
                .http
                .post(format!("{server_url}/threads/api/create/"))
                .header(CSRF_HEADER, &csrf)
                .multipart(form)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            if response.success {
                Ok(response.thread_id)
            } else {
                Err(ClientError::Api(response.error.unwrap_or_else(|| {
                    "Failed to create thread.".to_string()
                })))
            }
        }
        .await;

        self.inner.lock().await.create_in_flight = false;
        let thread_id = result?;

        let _ = self.events.send(ClientEvent::ThreadCreated { thread_id });
        if let Err(err) = self.refresh_threads(filter).await {
            warn!("thread list refresh after creation failed: {err}");
        }
        Ok(thread_id)
    }

    /// Users the viewer may address when creating a thread.
    pub async fn list_recipient_candidates(&self) -> Result<Vec<RecipientCandidate>, ClientError> {
        let session = self.session().await?;
        let response: RecipientsResponse = self
            .http
            .get(format!("{}/messages/api/allowed-users/", session.server_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.users)
    }

    /// Assignments that can back an assignment thread, optionally scoped to
    /// one student.
    pub async fn list_assignments(
        &self,
        student: Option<UserId>,
    ) -> Result<Vec<AssignmentRef>, ClientError> {
        let session = self.session().await?;
        let mut request = self
            .http
            .get(format!("{}/assignments/api/list/", session.server_url));
        if let Some(student) = student {
            request = request.query(&[("student_id", student.to_string())]);
        }
        let response: AssignmentsResponse =
            request.send().await?.error_for_status()?.json().await?;
        Ok(response.assignments)
    }

    pub async fn list_invoices(&self) -> Result<Vec<InvoiceRef>, ClientError> {
        let session = self.session().await?;
        let response: InvoicesResponse = self
            .http
            .get(format!("{}/invoice/api/list/", session.server_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.invoices)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
