//! Game hub connection: a WebSocket client keyed by player and provider
//! identity, supervised with the fixed reconnect schedule.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

use crate::dto::commands::HubCommand;
use crate::dto::hub::HubEvent;

/// Connection lifecycle states surfaced to the UI shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// First connection attempt in progress.
    Connecting,
    /// Session established.
    Connected,
    /// Connection lost; a scheduled retry is pending.
    Reconnecting,
    /// The reconnect schedule is spent; the session is unusable.
    Disconnected,
}

/// Cheap handle for issuing remote calls and observing connection state.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
    status: watch::Receiver<ConnectionStatus>,
}

impl HubHandle {
    /// Build a handle over the supervisor's command channel and status watch.
    pub fn new(
        commands: mpsc::UnboundedSender<HubCommand>,
        status: watch::Receiver<ConnectionStatus>,
    ) -> Self {
        Self { commands, status }
    }

    /// Queue a remote invocation. Fire-and-forget: delivery is attempted on
    /// the live session and the call is dropped with a warning otherwise.
    pub fn invoke(&self, command: HubCommand) {
        if self.commands.send(command).is_err() {
            warn!("hub supervisor is gone; dropping outbound invocation");
        }
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Subscribe to connection status updates.
    pub fn status_watcher(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }
}

/// Build the hub URL carrying the identity query parameters.
pub fn build_hub_url(
    base: &str,
    player_id: u64,
    provider_id: u64,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut()
        .append_pair("playerId", &player_id.to_string())
        .append_pair("providerId", &provider_id.to_string());
    Ok(url)
}

enum SessionEnd {
    /// Server closed or the transport failed; retry per the schedule.
    Lost,
    /// The router side went away; stop supervising entirely.
    LocalShutdown,
}

/// Supervise the hub connection for the whole session.
///
/// Connects, pumps frames both ways, and on loss retries along
/// `reconnect_schedule_ms`. A successful session resets the schedule.
/// When the schedule is spent the status flips to `Disconnected` and the
/// event sender is dropped, which the router treats as an unrecoverable
/// close.
pub async fn run_hub_supervisor(
    url: Url,
    reconnect_schedule_ms: Vec<u64>,
    events: mpsc::Sender<HubEvent>,
    mut commands: mpsc::UnboundedReceiver<HubCommand>,
    status: watch::Sender<ConnectionStatus>,
) {
    let mut attempt = 0usize;
    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _response)) => {
                info!(url = %url, "hub connected");
                attempt = 0;
                let _ = status.send(ConnectionStatus::Connected);
                match run_session(socket, &events, &mut commands).await {
                    SessionEnd::Lost => {}
                    SessionEnd::LocalShutdown => return,
                }
            }
            Err(err) => {
                warn!(url = %url, error = %err, "hub connection attempt failed");
            }
        }

        let Some(&delay_ms) = reconnect_schedule_ms.get(attempt) else {
            warn!("reconnect schedule exhausted; giving up on the session");
            let _ = status.send(ConnectionStatus::Disconnected);
            return;
        };
        attempt += 1;
        let _ = status.send(ConnectionStatus::Reconnecting);
        sleep(Duration::from_millis(delay_ms)).await;
    }
}

async fn run_session(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    events: &mpsc::Sender<HubEvent>,
    commands: &mut mpsc::UnboundedReceiver<HubCommand>,
) -> SessionEnd {
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => match HubEvent::from_json_str(&text) {
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            return SessionEnd::LocalShutdown;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to parse or validate hub event");
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    debug!("hub connection closed");
                    return SessionEnd::Lost;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "hub receive error");
                    return SessionEnd::Lost;
                }
            },
            command = commands.recv() => match command {
                Some(command) => {
                    let payload = match serde_json::to_string(&command) {
                        Ok(payload) => payload,
                        Err(err) => {
                            warn!(error = %err, "failed to serialize hub command `{command:?}`");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(payload)).await.is_err() {
                        return SessionEnd::Lost;
                    }
                }
                None => return SessionEnd::LocalShutdown,
            },
        }
    }
}
