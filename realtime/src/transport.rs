//! The tokio task that owns the socket and drives the connection state machine.

use crate::client::{ClientConfig, Shared};
use crate::error::Error;
use crate::state::{transition, ConnectionEvent, ConnectionState};
use events::{EventEnvelope, EventKind};
use futures_util::StreamExt;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Requests from the client handle to the transport task.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Connect,
    Disconnect,
    TokenChanged(Option<String>),
}

/// Supervisor loop: runs until the client handle is dropped.
///
/// Owns the socket, the bearer token, and the connection state. All
/// dispatch happens on this task, so envelopes are delivered in receive
/// order and each dispatch completes before the next frame is processed.
pub(crate) async fn run(
    shared: Arc<Shared>,
    config: ClientConfig,
    mut commands: UnboundedReceiver<Command>,
) {
    let mut state = ConnectionState::Disconnected;
    let mut token: Option<String> = None;
    let mut socket: Option<WsStream> = None;

    loop {
        state = match state {
            ConnectionState::Disconnected => {
                shared.set_connected(false);
                socket = None;

                let Some(command) = commands.recv().await else {
                    break;
                };

                match command {
                    // Without a token there is nothing to authenticate as;
                    // stay down until one appears.
                    Command::Connect if token.is_some() => {
                        transition(state, ConnectionEvent::ConnectRequested)
                    }
                    Command::Connect => state,
                    Command::TokenChanged(new_token) => {
                        token = new_token;
                        if token.is_some() {
                            transition(state, ConnectionEvent::ConnectRequested)
                        } else {
                            state
                        }
                    }
                    Command::Disconnect => state,
                }
            }

            ConnectionState::Connecting => match token.clone() {
                // Token revoked while a dial was queued up.
                None => ConnectionState::Disconnected,
                Some(bearer) => {
                    let url = config.endpoint.url_with_token(&bearer);
                    debug!("Opening events channel to {}", config.endpoint.as_str());

                    match connect_async(url.as_str()).await {
                        Ok((stream, _response)) => {
                            info!("Events channel connected");
                            shared.clear_error();
                            shared.set_connected(true);
                            socket = Some(stream);
                            transition(state, ConnectionEvent::Open)
                        }
                        Err(e) => {
                            let error = Error::from(e);
                            warn!("{error}");
                            shared.record_error(error.message().to_string());
                            shared.set_connected(false);
                            transition(state, ConnectionEvent::Error)
                        }
                    }
                }
            },

            ConnectionState::Connected => match socket.take() {
                Some(stream) => read_loop(stream, &shared, &mut commands, &mut token).await,
                // Unreachable in practice: Connected is only entered with a
                // freshly opened stream.
                None => ConnectionState::Disconnected,
            },

            ConnectionState::ReconnectScheduled => {
                wait_reconnect(config.reconnect_delay, &mut commands, &mut token).await
            }
        };

        // A shutdown while connected or waiting lands here with the channel
        // closed; bail out instead of blocking on recv forever.
        if commands.is_closed() && state == ConnectionState::Disconnected {
            break;
        }
    }

    shared.set_connected(false);
    debug!("Events transport task stopped");
}

/// Read frames off the live stream until it drops, the token goes away, or
/// a disconnect is requested. Returns the next state.
async fn read_loop(
    mut stream: WsStream,
    shared: &Arc<Shared>,
    commands: &mut UnboundedReceiver<Command>,
    token: &mut Option<String>,
) -> ConnectionState {
    let mut state = ConnectionState::Connected;

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_frame(text.as_str(), shared),
                Some(Ok(Message::Binary(_))) => {
                    warn!("Ignoring unexpected binary frame on events channel");
                }
                // Ping/pong is answered by the protocol layer.
                Some(Ok(Message::Close(_))) => {
                    info!("Events channel closed by server");
                    shared.set_connected(false);
                    return transition(state, ConnectionEvent::Close);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let error = Error::from(e);
                    warn!("{error}");
                    shared.record_error(error.message().to_string());
                    shared.set_connected(false);
                    state = transition(state, ConnectionEvent::Error);
                    // The stream is unusable after an error; treat it as closed.
                    return transition(state, ConnectionEvent::Close);
                }
                None => {
                    info!("Events channel dropped");
                    shared.set_connected(false);
                    return transition(state, ConnectionEvent::Close);
                }
            },

            command = commands.recv() => match command {
                None => {
                    let _ = stream.close(None).await;
                    shared.set_connected(false);
                    return ConnectionState::Disconnected;
                }
                Some(Command::Disconnect) => {
                    info!("Closing events channel on request");
                    let _ = stream.close(None).await;
                    shared.set_connected(false);
                    return transition(state, ConnectionEvent::DisconnectRequested);
                }
                Some(Command::TokenChanged(None)) => {
                    info!("Session token revoked, closing events channel");
                    *token = None;
                    let _ = stream.close(None).await;
                    shared.set_connected(false);
                    return transition(state, ConnectionEvent::DisconnectRequested);
                }
                // A refreshed token applies to the next dial; the live
                // connection was authenticated at open.
                Some(Command::TokenChanged(new_token)) => *token = new_token,
                Some(Command::Connect) => {}
            },
        }
    }
}

/// Sleep out the reconnect delay, still honoring disconnects and token
/// changes. Returns the next state.
async fn wait_reconnect(
    delay: Duration,
    commands: &mut UnboundedReceiver<Command>,
    token: &mut Option<String>,
) -> ConnectionState {
    debug!("Reconnecting in {}s", delay.as_secs_f32());

    let timer = tokio::time::sleep(delay);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            _ = &mut timer => {
                return transition(ConnectionState::ReconnectScheduled, ConnectionEvent::TimerFired);
            }

            command = commands.recv() => match command {
                None => return ConnectionState::Disconnected,
                Some(Command::Disconnect) => {
                    debug!("Reconnect cancelled on request");
                    return transition(
                        ConnectionState::ReconnectScheduled,
                        ConnectionEvent::DisconnectRequested,
                    );
                }
                Some(Command::TokenChanged(None)) => {
                    debug!("Session token revoked, reconnect cancelled");
                    *token = None;
                    return transition(
                        ConnectionState::ReconnectScheduled,
                        ConnectionEvent::DisconnectRequested,
                    );
                }
                Some(Command::TokenChanged(new_token)) => *token = new_token,
                // The timer is already pending; an explicit connect request
                // does not shortcut it.
                Some(Command::Connect) => {}
            },
        }
    }
}

/// Deserialize one text frame and hand it to the registry.
///
/// Malformed payloads are logged and discarded without touching the
/// connection or the registry. The `connection-established` envelope has
/// its timezone cached before generic dispatch, and is then delivered to
/// any subscribers of that kind like every other envelope.
fn handle_frame(text: &str, shared: &Arc<Shared>) {
    let envelope = match serde_json::from_str::<EventEnvelope>(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Discarding malformed events frame: {e}");
            return;
        }
    };

    if envelope.kind == EventKind::ConnectionEstablished {
        if let Some(timezone) = &envelope.timezone {
            shared.set_timezone(timezone.clone());
        }
    }

    shared.registry().dispatch(&envelope);
}
