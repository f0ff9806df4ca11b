//! Push-channel plumbing: one list-scope socket for the whole session and
//! at most one per-thread socket for the open thread. Reader loops reconnect
//! with capped exponential backoff; a dead socket never takes the client
//! down with it.

use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use shared::{
    domain::ThreadId,
    protocol::{ListEvent, ThreadEvent},
};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

use crate::{ClientError, PortalClient};

const RECONNECT_INITIAL_DELAY: Duration = Duration::from_secs(1);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Derive the socket URL from the portal base URL by scheme swap.
pub fn websocket_url(server_url: &str, path: &str) -> Result<String, ClientError> {
    let swapped = if let Some(rest) = server_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(ClientError::InvalidServerUrl(server_url.to_string()));
    };
    Ok(format!("{}{path}", swapped.trim_end_matches('/')))
}

/// Spawn the list-scope reader. Runs until the session shuts down.
pub(crate) fn spawn_list_channel(client: Arc<PortalClient>, url: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut delay = RECONNECT_INITIAL_DELAY;
        loop {
            if !client.is_session_open().await {
                return;
            }
            match connect_async(&url).await {
                Ok((stream, _)) => {
                    info!(url = %url, "list channel connected");
                    delay = RECONNECT_INITIAL_DELAY;
                    let (_, mut reader) = stream.split();
                    while let Some(frame) = reader.next().await {
                        match frame {
                            Ok(Message::Text(text)) => {
                                match serde_json::from_str::<ListEvent>(&text) {
                                    Ok(ListEvent::ThreadListUpdate) => {
                                        client.on_list_update().await;
                                    }
                                    Err(err) => {
                                        warn!("unrecognized list frame: {err}");
                                    }
                                }
                            }
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(err) => {
                                warn!("list channel receive failed: {err}");
                                break;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(url = %url, "list channel connect failed: {err}");
                }
            }
            if !client.is_session_open().await {
                return;
            }
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(RECONNECT_MAX_DELAY);
        }
    })
}

/// Spawn the per-thread reader. Stops for good once the thread is no longer
/// the open one; opening another thread aborts this task outright.
pub(crate) fn spawn_thread_channel(
    client: Arc<PortalClient>,
    thread_id: ThreadId,
    url: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut delay = RECONNECT_INITIAL_DELAY;
        loop {
            if !client.is_thread_open(thread_id).await {
                return;
            }
            match connect_async(&url).await {
                Ok((stream, _)) => {
                    info!(thread_id = %thread_id, "thread channel connected");
                    delay = RECONNECT_INITIAL_DELAY;
                    let (_, mut reader) = stream.split();
                    while let Some(frame) = reader.next().await {
                        match frame {
                            Ok(Message::Text(text)) => {
                                match serde_json::from_str::<ThreadEvent>(&text) {
                                    Ok(ThreadEvent::Message { message }) => {
                                        client.apply_pushed_message(thread_id, message).await;
                                    }
                                    Ok(ThreadEvent::Typing {
                                        user_id,
                                        user_name,
                                        is_typing,
                                    }) => {
                                        client
                                            .on_typing(thread_id, user_id, user_name, is_typing)
                                            .await;
                                    }
                                    Err(err) => {
                                        warn!(thread_id = %thread_id, "unrecognized thread frame: {err}");
                                    }
                                }
                            }
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(err) => {
                                warn!(thread_id = %thread_id, "thread channel receive failed: {err}");
                                break;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(thread_id = %thread_id, "thread channel connect failed: {err}");
                }
            }
            if !client.is_thread_open(thread_id).await {
                return;
            }
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(RECONNECT_MAX_DELAY);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_url_swaps_scheme_and_appends_path() {
        assert_eq!(
            websocket_url("http://portal.test", "/ws/thread-list/").unwrap(),
            "ws://portal.test/ws/thread-list/"
        );
        assert_eq!(
            websocket_url("https://portal.test/", "/ws/thread-list/").unwrap(),
            "wss://portal.test/ws/thread-list/"
        );
    }

    #[test]
    fn websocket_url_rejects_other_schemes() {
        assert!(matches!(
            websocket_url("ftp://portal.test", "/ws/"),
            Err(ClientError::InvalidServerUrl(_))
        ));
    }
}
