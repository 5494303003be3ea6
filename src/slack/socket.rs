//! Slack Socket Mode event stream.
//!
//! Slack pushes envelopes over a WebSocket opened with the app-level
//! token. Every envelope carrying an `envelope_id` must be acknowledged.
//! A `disconnect` envelope asks us to move to a fresh URL; any other loss
//! of the socket is final and reported as `SlackEvent::Disconnected`.

use std::time::Duration;

use backon::BackoffBuilder;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::common::error::{ConnectionError, ConnectionResult};
use crate::common::messages::{SlackEvent, SlackMessage};

use super::api::SlackApi;

pub type SocketStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What one inbound envelope asks of us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameAction {
    Hello,
    Event(SlackEvent),
    /// Slack is about to drop this socket; move to a new URL.
    Refresh,
    Ignore,
}

/// A decoded envelope: the id to acknowledge, if any, and the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub ack: Option<String>,
    pub action: FrameAction,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    envelope_id: Option<String>,
    payload: Option<Value>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventsApiPayload {
    event: InnerEvent,
}

#[derive(Debug, Deserialize)]
struct InnerEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    channel: String,
    user: Option<String>,
    #[serde(default)]
    text: String,
    subtype: Option<String>,
    bot_id: Option<String>,
}

/// Decode one text frame.
pub fn interpret_frame(text: &str) -> Result<Frame, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let ack = envelope.envelope_id;

    let action = match envelope.kind.as_str() {
        "hello" => FrameAction::Hello,
        "disconnect" => {
            info!(
                "Slack asked to refresh the socket ({})",
                envelope.reason.as_deref().unwrap_or("no reason")
            );
            FrameAction::Refresh
        }
        "events_api" => {
            let payload: EventsApiPayload =
                serde_json::from_value(envelope.payload.unwrap_or_default())?;
            FrameAction::Event(event_from(payload.event))
        }
        other => {
            debug!("Ignoring Socket Mode envelope of type {}", other);
            FrameAction::Ignore
        }
    };

    Ok(Frame { ack, action })
}

fn event_from(event: InnerEvent) -> SlackEvent {
    if event.kind != "message" {
        return SlackEvent::Unrecognized { kind: event.kind };
    }

    SlackEvent::Message(SlackMessage {
        channel_id: event.channel,
        user_id: event.user,
        text: event.text,
        subtype: event.subtype,
        bot_id: event.bot_id,
    })
}

/// Retry schedule for moving to a fresh socket URL.
/// 1s initial, 30s max, factor 2, with jitter, 5 retries.
fn refresh_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(30))
        .with_factor(2.0)
        .with_jitter()
        .with_max_times(5)
        .build()
}

/// How one socket stopped.
#[derive(Debug, PartialEq, Eq)]
enum SocketEnd {
    Refresh,
    Closed,
    Shutdown,
}

pub struct SocketModeClient {
    api: SlackApi,
    app_token: String,
    events_tx: mpsc::UnboundedSender<SlackEvent>,
    shutdown_rx: watch::Receiver<bool>,
}

impl SocketModeClient {
    pub fn new(
        api: SlackApi,
        app_token: impl Into<String>,
        events_tx: mpsc::UnboundedSender<SlackEvent>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            api,
            app_token: app_token.into(),
            events_tx,
            shutdown_rx,
        }
    }

    /// Request a socket URL and open the WebSocket.
    pub async fn connect(&self) -> ConnectionResult<SocketStream> {
        let url = self
            .api
            .open_socket_url(&self.app_token)
            .await
            .map_err(|source| ConnectionError::SlackApi {
                method: "apps.connections.open",
                source,
            })?;
        debug!("Opening Slack socket");

        let (socket, _) = connect_async(url.as_str()).await?;
        Ok(socket)
    }

    /// Pump envelopes until the socket is lost or shutdown is signalled.
    /// Always ends with a `Disconnected` event.
    pub async fn run(mut self, mut socket: SocketStream) {
        loop {
            match self.handle_socket(&mut socket).await {
                SocketEnd::Refresh => match self.reconnect().await {
                    Ok(fresh) => {
                        info!("Moved to a fresh Slack socket");
                        socket = fresh;
                    }
                    Err(e) => {
                        error!("Could not refresh the Slack socket: {}", e);
                        break;
                    }
                },
                SocketEnd::Closed => break,
                SocketEnd::Shutdown => {
                    if let Err(e) = socket.close(None).await {
                        debug!("Slack socket close failed: {}", e);
                    }
                    break;
                }
            }
        }

        info!("Slack socket closed");
        self.emit(SlackEvent::Disconnected);
    }

    async fn reconnect(&self) -> ConnectionResult<SocketStream> {
        let mut backoff = refresh_backoff();

        loop {
            match self.connect().await {
                Ok(socket) => return Ok(socket),
                Err(e) => {
                    let Some(delay) = backoff.next() else {
                        return Err(e);
                    };
                    warn!(
                        "Slack socket refresh failed: {}. Retrying in {:.1}s...",
                        e,
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn handle_socket<S>(&mut self, socket: &mut WebSocketStream<S>) -> SocketEnd
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            tokio::select! {
                frame = socket.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => {
                            info!("Slack closed the socket: {:?}", frame);
                            return SocketEnd::Closed;
                        }
                        // Pings are answered by tungstenite itself
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            error!("Slack socket error: {}", e);
                            return SocketEnd::Closed;
                        }
                        None => return SocketEnd::Closed,
                    };
                    trace!("<< {}", text);

                    let frame = match interpret_frame(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("Skipping malformed Slack envelope: {}", e);
                            continue;
                        }
                    };

                    if let Some(envelope_id) = frame.ack {
                        let ack = json!({ "envelope_id": envelope_id }).to_string();
                        if let Err(e) = socket.send(Message::Text(ack)).await {
                            error!("Failed to acknowledge Slack envelope: {}", e);
                            return SocketEnd::Closed;
                        }
                    }

                    match frame.action {
                        FrameAction::Hello => {
                            info!("Slack socket is ready");
                            self.emit(SlackEvent::Connected);
                        }
                        FrameAction::Event(event) => self.emit(event),
                        FrameAction::Refresh => return SocketEnd::Refresh,
                        FrameAction::Ignore => {}
                    }
                }

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        return SocketEnd::Shutdown;
                    }
                }
            }
        }
    }

    fn emit(&self, event: SlackEvent) {
        if let Err(e) = self.events_tx.send(event) {
            debug!("Slack event receiver closed: {}", e);
        }
    }
}
