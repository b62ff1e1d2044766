//! Websocket transport for the Socket.IO push server.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::event::{parse_frame, Frame, PushError, PushResult, CONNECT_FRAME, PONG_FRAME};
use crate::hub::PushHub;

/// A running transport. Dropping it closes the connection.
pub struct SocketTransport {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SocketTransport {
    /// Close the connection and wait for the reader task to finish.
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// Whether the reader task is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Build the websocket endpoint for a server base URL.
pub fn socket_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/socket.io/?EIO=4&transport=websocket", base)
}

/// Connect to the push server and publish every received event into `hub`.
pub async fn connect(base_url: &str, hub: PushHub) -> PushResult<SocketTransport> {
    let endpoint = socket_endpoint(base_url);
    let (stream, _) = tokio_tungstenite::connect_async(endpoint.as_str())
        .await
        .map_err(|e| PushError::Transport(e.to_string()))?;

    tracing::info!(endpoint = %endpoint, "push channel connected");

    let (mut sink, mut stream) = stream.split();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                msg = stream.next() => {
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "push channel read failed");
                            break;
                        }
                    };

                    let reply = match parse_frame(&text) {
                        Ok(Frame::Open { .. }) => Some(CONNECT_FRAME),
                        Ok(Frame::Ping) => Some(PONG_FRAME),
                        Ok(Frame::Event { event, .. }) => {
                            hub.publish(event);
                            None
                        }
                        Ok(Frame::Close) | Ok(Frame::Disconnected) => break,
                        Ok(Frame::ConnectError(message)) => {
                            tracing::warn!(%message, "push namespace refused");
                            break;
                        }
                        Ok(_) => None,
                        Err(e) => {
                            tracing::debug!(error = %e, "ignoring unparseable push frame");
                            None
                        }
                    };

                    if let Some(reply) = reply {
                        if sink.send(Message::Text(reply.to_string())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        let _ = sink.close().await;
        tracing::info!("push channel closed");
    });

    Ok(SocketTransport {
        shutdown: Some(shutdown_tx),
        handle: Some(handle),
    })
}
