use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::message::{ClientMessage, ServerMessage};
use crate::error::InterviewResult;
use crate::kernel::event::{ConnectionEvent, Event};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Outbound half of an open interview socket. Inbound frames are decoded and
/// forwarded to the kernel channel by a reader task.
pub struct SocketHandle {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    cancel: CancellationToken,
    writer: JoinHandle<()>,
}

impl SocketHandle {
    pub fn send(&self, message: ClientMessage) {
        debug!(kind = message.kind(), "outbound");
        if self.outbound.send(message).is_err() {
            warn!("socket writer gone, message dropped");
        }
    }

    /// Sends a close frame after anything already queued.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Closes and waits (bounded) for queued frames and the close frame to go out.
    pub async fn shutdown(self) {
        self.close();
        if tokio::time::timeout(SHUTDOWN_GRACE, self.writer).await.is_err() {
            warn!("socket writer did not finish in time");
        }
    }
}

/// Opens the socket and spawns its reader and writer tasks. Connection loss is
/// reported once as `ConnectionEvent::Closed`; there is no reconnect.
pub async fn connect(
    url: &str,
    inbound: mpsc::Sender<Event>,
    cancel: CancellationToken,
) -> InterviewResult<SocketHandle> {
    let (ws, _response) = connect_async(url).await?;
    info!(%url, "socket open");
    let (mut sink, mut stream) = ws.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ClientMessage>();
    let close = cancel.child_token();

    let writer_close = close.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                next = rx.recv() => {
                    let Some(message) = next else { break };
                    let text = match message.encode() {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(error = %err, "outbound encode failed");
                            continue;
                        }
                    };
                    if let Err(err) = sink.send(Message::Text(text)).await {
                        warn!(error = %err, "socket write failed");
                        break;
                    }
                }
                _ = writer_close.cancelled() => {
                    while let Ok(message) = rx.try_recv() {
                        if let Ok(text) = message.encode() {
                            let _ = sink.send(Message::Text(text)).await;
                        }
                    }
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        debug!("socket writer stopped");
    });

    let reader_close = close.clone();
    tokio::spawn(async move {
        let reason = loop {
            let frame = tokio::select! {
                frame = stream.next() => frame,
                _ = reader_close.cancelled() => break Some("closed locally".to_string()),
            };
            match frame {
                Some(Ok(Message::Text(text))) => match ServerMessage::decode(&text) {
                    Ok(message) => {
                        if inbound.send(Event::Server(message)).await.is_err() {
                            break None;
                        }
                    }
                    Err(err) => warn!(error = %err, "malformed message ignored"),
                },
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|f| f.reason.into_owned());
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => break Some(err.to_string()),
                None => break None,
            }
        };
        info!(reason = reason.as_deref().unwrap_or("-"), "socket closed");
        let _ = inbound
            .send(Event::Connection(ConnectionEvent::Closed { reason }))
            .await;
    });

    Ok(SocketHandle {
        outbound: tx,
        cancel: close,
        writer,
    })
}
