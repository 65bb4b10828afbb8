//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{SessionCommand, TickSnapshot};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (ws_sink, ws_stream) = socket.split();
    serve_connection(Uuid::new_v4(), ws_sink, ws_stream, state).await;
}

/// Drive one connection from connect to disconnect
async fn serve_connection<S, R, E>(conn_id: Uuid, mut sink: S, stream: R, state: AppState)
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    info!(conn_id = %conn_id, "User connected");

    let command_tx = state.session.command_tx.clone();

    // Subscribe before the connect command so no tick after it is missed
    let snapshot_rx = state.session.subscribe();

    if command_tx
        .send(SessionCommand::Connect { conn_id })
        .await
        .is_err()
    {
        error!(conn_id = %conn_id, "Session is not running");
        return;
    }

    if let Err(e) = send_text(&mut sink, state.map_payload.as_str()).await {
        debug!(conn_id = %conn_id, error = %e, "Failed to send map");
    } else {
        run_session(conn_id, sink, stream, command_tx.clone(), snapshot_rx).await;
    }

    // Cleanup on disconnect
    let _ = command_tx.send(SessionCommand::Disconnect { conn_id }).await;

    info!(conn_id = %conn_id, "User disconnected");
}

/// Run the WebSocket session with read/write split
async fn run_session<S, R, E>(
    conn_id: Uuid,
    mut sink: S,
    stream: R,
    command_tx: mpsc::Sender<SessionCommand>,
    mut snapshot_rx: broadcast::Receiver<Arc<TickSnapshot>>,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    // Spawn writer task: broadcast snapshots -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match snapshot_rx.recv().await {
                Ok(snapshot) => {
                    if let Err(e) = send_snapshot(&mut sink, &snapshot).await {
                        debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        conn_id = %conn_id,
                        lagged_count = n,
                        "Client lagged, skipping {} snapshots", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(conn_id = %conn_id, "Snapshot channel closed");
                    break;
                }
            }
        }
    });

    read_frames(conn_id, stream, &command_tx).await;

    writer_handle.abort();
}

/// Reader loop: WebSocket -> session, until the client goes away
async fn read_frames<R, E>(conn_id: Uuid, mut stream: R, command_tx: &mpsc::Sender<SessionCommand>)
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let rate_limiter = ConnectionRateLimiter::new();

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                        continue;
                    }
                };

                // Throws are flood-limited; key state always goes through
                if matches!(client_msg, ClientMsg::Snowballs(_)) && !rate_limiter.check_fire() {
                    warn!(conn_id = %conn_id, "Rate limited snowball throw");
                    continue;
                }

                if command_tx.send(command_for(conn_id, client_msg)).await.is_err() {
                    debug!(conn_id = %conn_id, "Command channel closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Map an inbound message to the session command it triggers
fn command_for(conn_id: Uuid, msg: ClientMsg) -> SessionCommand {
    match msg {
        ClientMsg::SendNickname(nickname) => SessionCommand::Nickname { conn_id, nickname },
        ClientMsg::Inputs(input) => SessionCommand::Input { conn_id, input },
        ClientMsg::Snowballs(angle) => SessionCommand::Fire { conn_id, angle },
    }
}

/// Send the four per-tick messages of a snapshot
async fn send_snapshot<S>(sink: &mut S, snapshot: &TickSnapshot) -> Result<(), String>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    for msg in snapshot.messages() {
        send_msg(sink, &msg).await?;
    }
    Ok(())
}

/// Send a message over WebSocket
async fn send_msg<S>(sink: &mut S, msg: &ServerMsg<'_>) -> Result<(), String>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let json = msg.to_json().map_err(|e| e.to_string())?;
    send_text(sink, &json).await
}

/// Send an already encoded frame
async fn send_text<S>(sink: &mut S, text: &str) -> Result<(), String>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    sink.send(Message::Text(text.to_string()))
        .await
        .map_err(|e| e.to_string())
}
