// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Async WebSocket connection layer with automatic reconnection.
//!
//! Provides a connection handle that manages a single logical connection to
//! the report feed with a fixed-delay reconnect policy, endpoint hot-reload,
//! and graceful shutdown. The stream is receive-only; nothing is queued for
//! sending.

use std::time::Duration;

use futures_util::StreamExt;
use log::{error, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Default feed endpoint.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8765";

/// Configuration for the feed connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Feed endpoint as a `ws://` URL.
    pub url: String,
    /// Delay before reconnecting after disconnect. Fixed, no backoff.
    pub reconnect_delay: Duration,
    /// Channel buffer size for received frames.
    pub buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            reconnect_delay: Duration::from_secs(5),
            buffer_size: 1024,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Attempting to connect.
    Connecting,
    /// Successfully connected.
    Connected,
    /// Disconnected (will attempt reconnect).
    Disconnected,
    /// Connection error occurred.
    Error(String),
}

/// Events emitted by the connection.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Connection state changed.
    StateChanged(ConnectionState),
    /// One text frame received.
    FrameReceived(String),
}

/// Handle to a managed feed connection.
///
/// The connection runs in a background task and automatically reconnects on
/// disconnect. Use `recv()` to receive events and `set_url()` to change the
/// endpoint at runtime.
pub struct Connection {
    event_rx: mpsc::Receiver<ConnectionEvent>,
    url_tx: watch::Sender<String>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Spawn a new connection task with the given configuration.
    ///
    /// Returns a handle that can be used to receive events, change the
    /// endpoint, and shut down the connection.
    #[must_use]
    pub fn spawn(config: ConnectionConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.buffer_size);
        let (url_tx, url_rx) = watch::channel(config.url.clone());
        let cancel_token = CancellationToken::new();

        let task_cancel = cancel_token.clone();
        let reconnect_delay = config.reconnect_delay;

        tokio::spawn(async move {
            connection_loop(event_tx, url_rx, task_cancel, reconnect_delay).await;
        });

        Self {
            event_rx,
            url_tx,
            cancel_token,
        }
    }

    /// Receive the next event from the connection.
    ///
    /// Returns `None` if the connection has been shut down.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.event_rx.recv().await
    }

    /// Change the feed endpoint.
    ///
    /// The connection will disconnect and reconnect to the new endpoint.
    pub fn set_url(&self, url: String) {
        let _ = self.url_tx.send(url);
    }

    /// Get the current feed endpoint.
    #[must_use]
    pub fn current_url(&self) -> String {
        self.url_tx.borrow().clone()
    }

    /// Shut down the connection.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn connection_loop(
    event_tx: mpsc::Sender<ConnectionEvent>,
    mut url_rx: watch::Receiver<String>,
    cancel_token: CancellationToken,
    reconnect_delay: Duration,
) {
    loop {
        if cancel_token.is_cancelled() {
            info!("Connection cancelled");
            return;
        }

        let current_url = url_rx.borrow_and_update().clone();

        // Send connecting state
        if event_tx
            .send(ConnectionEvent::StateChanged(ConnectionState::Connecting))
            .await
            .is_err()
        {
            return; // Receiver dropped
        }

        info!("Connecting to {}...", current_url);

        match connect_and_process(&current_url, &event_tx, &mut url_rx, &cancel_token).await {
            Ok(reason) => match reason {
                ReconnectReason::UrlChanged => {
                    info!("Feed endpoint changed, reconnecting immediately...");
                    continue;
                }
                ReconnectReason::ConnectionClosed => {
                    info!("Connection closed by server");
                    let _ = event_tx
                        .send(ConnectionEvent::StateChanged(ConnectionState::Disconnected))
                        .await;
                }
                ReconnectReason::Cancelled => {
                    info!("Connection cancelled");
                    return;
                }
            },
            Err(e) => {
                error!("Connection error: {}", e);
                let _ = event_tx
                    .send(ConnectionEvent::StateChanged(ConnectionState::Error(
                        e.to_string(),
                    )))
                    .await;
            }
        }

        warn!("Reconnecting in {} seconds...", reconnect_delay.as_secs());

        tokio::select! {
            () = sleep(reconnect_delay) => {}
            () = cancel_token.cancelled() => {
                info!("Connection cancelled during reconnect delay");
                return;
            }
        }
    }
}

enum ReconnectReason {
    UrlChanged,
    ConnectionClosed,
    Cancelled,
}

async fn connect_and_process(
    url: &str,
    event_tx: &mpsc::Sender<ConnectionEvent>,
    url_rx: &mut watch::Receiver<String>,
    cancel_token: &CancellationToken,
) -> Result<ReconnectReason, Box<dyn std::error::Error + Send + Sync>> {
    let (ws_stream, _response) = connect_async(url).await?;
    info!("Connected to {}", url);

    if event_tx
        .send(ConnectionEvent::StateChanged(ConnectionState::Connected))
        .await
        .is_err()
    {
        return Ok(ReconnectReason::Cancelled);
    }

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if event_tx
                            .send(ConnectionEvent::FrameReceived(text))
                            .await
                            .is_err()
                        {
                            return Ok(ReconnectReason::Cancelled);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Ok(ReconnectReason::ConnectionClosed);
                    }
                    // Binary, ping and pong frames carry no reports
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(Box::new(e));
                    }
                }
            }

            _ = url_rx.changed() => {
                let new_url = url_rx.borrow_and_update().clone();
                if new_url != url {
                    info!("Feed endpoint changed from {} to {}", url, new_url);
                    return Ok(ReconnectReason::UrlChanged);
                }
            }

            () = cancel_token.cancelled() => {
                return Ok(ReconnectReason::Cancelled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_receives_text_frames_and_reports_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(r#"{"From":"TA1ABC"}"#.to_string()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        });

        let mut connection = Connection::spawn(ConnectionConfig {
            url: format!("ws://{}", addr),
            reconnect_delay: Duration::from_millis(50),
            buffer_size: 16,
        });

        let mut saw_frame = false;
        let mut saw_disconnect = false;
        while let Some(event) = connection.recv().await {
            match event {
                ConnectionEvent::FrameReceived(text) => {
                    assert!(text.contains("TA1ABC"));
                    saw_frame = true;
                }
                ConnectionEvent::StateChanged(ConnectionState::Disconnected) => {
                    saw_disconnect = true;
                    break;
                }
                ConnectionEvent::StateChanged(_) => {}
            }
        }

        assert!(saw_frame);
        assert!(saw_disconnect);
        connection.shutdown();
    }

    #[tokio::test]
    async fn test_failed_connect_schedules_retry() {
        // Nothing listens here; the connector must report the error and try again.
        let mut connection = Connection::spawn(ConnectionConfig {
            url: "ws://127.0.0.1:1".to_string(),
            reconnect_delay: Duration::from_millis(10),
            buffer_size: 16,
        });

        let mut attempts = 0;
        while let Some(event) = connection.recv().await {
            if let ConnectionEvent::StateChanged(ConnectionState::Connecting) = event {
                attempts += 1;
                if attempts >= 2 {
                    break;
                }
            }
        }

        assert!(attempts >= 2);
        connection.shutdown();
    }
}
